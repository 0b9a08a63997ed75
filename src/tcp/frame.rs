use crate::common::buffer::ReadBuffer;
use crate::common::cursor::WriteCursor;
use crate::common::frame::{constant, Frame, FrameHeader, FrameParser, TxId};
use crate::common::phys::format_bytes;
use crate::decode::AduDecodeLevel;
use crate::error::{FrameParseError, RequestError};
use crate::types::UnitId;

pub(crate) mod constants {
    /// Size of the MBAP header in bytes
    pub(crate) const HEADER_LENGTH: usize = 7;
    /// Maximum size of a TCP frame
    pub(crate) const MAX_FRAME_LENGTH: usize =
        HEADER_LENGTH + crate::common::frame::constant::MAX_ADU_LENGTH;
    /// Maximum value of the MBAP length field, the unit id counts towards it
    pub(crate) const MAX_LENGTH_FIELD: usize =
        crate::common::frame::constant::MAX_ADU_LENGTH + 1;
}

#[derive(Clone, Copy)]
struct MbapHeader {
    tx_id: TxId,
    adu_length: usize,
    unit_id: UnitId,
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(MbapHeader),
}

pub(crate) struct MbapParser {
    state: ParseState,
}

impl MbapParser {
    pub(crate) fn new() -> Self {
        Self {
            state: ParseState::Begin,
        }
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<MbapHeader, RequestError> {
        let tx_id = TxId::new(cursor.read_u16_be()?);
        let protocol_id = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()? as usize;
        let unit_id = UnitId::new(cursor.read_u8()?);

        if protocol_id != 0 {
            return Err(FrameParseError::UnknownProtocolId(protocol_id).into());
        }

        if length > constants::MAX_LENGTH_FIELD {
            return Err(
                FrameParseError::MbapLengthTooBig(length, constants::MAX_LENGTH_FIELD).into(),
            );
        }

        // must be > 0 because the 1-byte unit identifier counts towards the length
        if length == 0 {
            return Err(FrameParseError::MbapLengthZero.into());
        }

        Ok(MbapHeader {
            tx_id,
            adu_length: length - 1,
            unit_id,
        })
    }

    fn parse_body(header: &MbapHeader, cursor: &mut ReadBuffer) -> Result<Frame, RequestError> {
        let mut frame = Frame::new(FrameHeader::new(header.unit_id, header.tx_id));
        frame.set(cursor.read(header.adu_length)?);
        Ok(frame)
    }
}

impl FrameParser for MbapParser {
    fn max_frame_size(&self) -> usize {
        constants::MAX_FRAME_LENGTH
    }

    fn parse(
        &mut self,
        cursor: &mut ReadBuffer,
        decode_level: AduDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.adu_length {
                    return Ok(None);
                }

                let frame = Self::parse_body(&header, cursor)?;
                self.state = ParseState::Begin;

                if decode_level.enabled() {
                    tracing::info!(
                        "MBAP RX - {}",
                        MbapDisplay::new(decode_level, frame.header, frame.payload())
                    );
                }

                Ok(Some(frame))
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor, decode_level)
            }
        }
    }

    fn reset(&mut self) {
        self.state = ParseState::Begin;
    }
}

pub(crate) struct MbapFormatter {
    buffer: [u8; constants::MAX_FRAME_LENGTH],
}

impl MbapFormatter {
    pub(crate) fn new() -> Self {
        Self {
            buffer: [0; constants::MAX_FRAME_LENGTH],
        }
    }

    /// Write an MBAP header in front of a serialized PDU, patching the
    /// length field once the total size is known. Taking the PDU as raw
    /// bytes lets a retransmission re-emit it byte-identically under a
    /// fresh transaction id.
    pub(crate) fn format_raw(
        &mut self,
        header: FrameHeader,
        pdu: &[u8],
        decode_level: AduDecodeLevel,
    ) -> Result<&[u8], RequestError> {
        let end_position = {
            let mut cursor = WriteCursor::new(self.buffer.as_mut());

            cursor.write_u16_be(header.tx_id.to_u16())?;
            cursor.write_u16_be(0)?; // protocol id
            cursor.seek_from_current(2)?; // write the length last
            cursor.write_u8(header.unit_id.value)?;
            cursor.write_bytes(pdu)?;

            cursor.position()
        };

        self.finish(header, end_position, decode_level)
    }

    fn finish(
        &mut self,
        header: FrameHeader,
        end_position: usize,
        decode_level: AduDecodeLevel,
    ) -> Result<&[u8], RequestError> {
        // the length field includes the unit id byte but not the 6 bytes before it
        let adu_length = end_position - constants::HEADER_LENGTH;

        if adu_length > constant::MAX_ADU_LENGTH {
            return Err(
                crate::error::InternalError::AduTooBig(adu_length, constant::MAX_ADU_LENGTH)
                    .into(),
            );
        }

        {
            let mut cursor = WriteCursor::new(self.buffer.as_mut());
            cursor.seek_from_start(4)?;
            cursor.write_u16_be((adu_length + 1) as u16)?;
        }

        let frame = match self.buffer.get(..end_position) {
            Some(frame) => frame,
            None => return Err(crate::error::InternalError::BadSeekOperation.into()),
        };

        if decode_level.enabled() {
            tracing::info!(
                "MBAP TX - {}",
                MbapDisplay::new(
                    decode_level,
                    header,
                    &frame[constants::HEADER_LENGTH..]
                )
            );
        }

        Ok(frame)
    }
}

struct MbapDisplay<'a> {
    level: AduDecodeLevel,
    header: FrameHeader,
    payload: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    fn new(level: AduDecodeLevel, header: FrameHeader, payload: &'a [u8]) -> Self {
        MbapDisplay {
            level,
            header,
            payload,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {} unit: {} (len = {})",
            self.header.tx_id,
            self.header.unit_id,
            self.payload.len()
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}
