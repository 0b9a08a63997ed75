use crate::common::buffer::ReadBuffer;
use crate::common::phys::PhysLayer;
use crate::decode::{AduDecodeLevel, DecodeLevel};
use crate::error::RequestError;
use crate::types::UnitId;

pub(crate) mod constant {
    /// Maximum number of bytes a PDU may occupy, 256 - MBAP unit id - 2 CRC bytes
    /// carried by serial gateways
    pub(crate) const MAX_ADU_LENGTH: usize = 253;
}

/// Transaction id inserted into the MBAP header and used to correlate responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    pub(crate) fn next(&mut self) -> TxId {
        let ret = *self;
        self.value = self.value.wrapping_add(1);
        ret
    }
}

impl Default for TxId {
    fn default() -> Self {
        TxId::new(0)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) unit_id: UnitId,
    pub(crate) tx_id: TxId,
}

impl FrameHeader {
    pub(crate) fn new(unit_id: UnitId, tx_id: TxId) -> Self {
        FrameHeader { unit_id, tx_id }
    }
}

pub(crate) struct Frame {
    pub(crate) header: FrameHeader,
    length: usize,
    pdu: [u8; constant::MAX_ADU_LENGTH],
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("payload", &self.payload())
            .finish()
    }
}

impl Frame {
    pub(crate) fn new(header: FrameHeader) -> Frame {
        Frame {
            header,
            length: 0,
            pdu: [0; constant::MAX_ADU_LENGTH],
        }
    }

    pub(crate) fn set(&mut self, src: &[u8]) -> bool {
        if src.len() > self.pdu.len() {
            return false;
        }

        self.pdu[0..src.len()].copy_from_slice(src);
        self.length = src.len();
        true
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.pdu[..self.length]
    }
}

/// Incremental parser of a byte stream into complete frames
pub(crate) trait FrameParser {
    /// The maximum size of a frame this parser can produce
    fn max_frame_size(&self) -> usize;

    /// Parse bytes from the buffer, returning `Some(..)` once a full frame is
    /// present. Partial frames leave state behind for the next call.
    fn parse(
        &mut self,
        buffer: &mut ReadBuffer,
        decode_level: AduDecodeLevel,
    ) -> Result<Option<Frame>, RequestError>;

    /// Discard any partially accumulated frame state. Called when the
    /// underlying connection is replaced.
    fn reset(&mut self);
}

pub(crate) struct FramedReader<T>
where
    T: FrameParser,
{
    parser: T,
    buffer: ReadBuffer,
}

impl<T> FramedReader<T>
where
    T: FrameParser,
{
    pub(crate) fn new(parser: T) -> Self {
        let size = parser.max_frame_size();
        Self {
            parser,
            buffer: ReadBuffer::new(size),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.parser.reset();
        self.buffer.clear();
    }

    pub(crate) async fn next_frame(
        &mut self,
        io: &mut PhysLayer,
        decode_level: DecodeLevel,
    ) -> Result<Frame, RequestError> {
        loop {
            match self.parser.parse(&mut self.buffer, decode_level.adu)? {
                Some(frame) => return Ok(frame),
                None => {
                    self.buffer.read_some(io, decode_level.physical).await?;
                }
            }
        }
    }
}
