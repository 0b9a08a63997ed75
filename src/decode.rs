/// Controls the decoding of transmitted and received data at the application,
/// frame, and physical layer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeLevel {
    /// Controls the protocol data unit decoding
    pub pdu: PduDecodeLevel,
    /// Controls the MBAP frame decoding
    pub adu: AduDecodeLevel,
    /// Controls the logging of physical layer read/write
    pub physical: PhysDecodeLevel,
}

/// Controls how transmitted and received Protocol Data Units (PDUs) are decoded at the INFO log level
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PduDecodeLevel {
    /// Decode nothing
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the actual data values
    DataValues,
}

/// Controls how the transmitted and received MBAP frames are decoded at the INFO log level
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AduDecodeLevel {
    /// Decode nothing
    Nothing,
    /// Decode the header
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

/// Controls how data transmitted at the physical layer (TCP) is logged
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PhysDecodeLevel {
    /// Log nothing
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(pdu: PduDecodeLevel, adu: AduDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel { pdu, adu, physical }
    }

    /// replace the PDU decode level
    pub fn pdu(self, level: PduDecodeLevel) -> Self {
        Self { pdu: level, ..self }
    }

    /// replace the frame decode level
    pub fn adu(self, level: AduDecodeLevel) -> Self {
        Self { adu: level, ..self }
    }

    /// replace the physical layer decode level
    pub fn physical(self, level: PhysDecodeLevel) -> Self {
        Self {
            physical: level,
            ..self
        }
    }
}

impl Default for DecodeLevel {
    fn default() -> Self {
        Self {
            pdu: PduDecodeLevel::Nothing,
            adu: AduDecodeLevel::Nothing,
            physical: PhysDecodeLevel::Nothing,
        }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            adu: AduDecodeLevel::Nothing,
            physical: PhysDecodeLevel::Nothing,
        }
    }
}

impl PduDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PduDecodeLevel::Nothing)
    }

    pub(crate) fn data_values(&self) -> bool {
        matches!(self, PduDecodeLevel::DataValues)
    }
}

impl AduDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, AduDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        matches!(self, AduDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(&self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}
