use crate::client::message::Promise;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::traits::Serialize;
use crate::decode::PduDecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::types::{AddressRange, Indexed};

/// Read of a contiguous range of 16-bit registers, holding or input
pub(crate) struct ReadRegisters {
    request: AddressRange,
    promise: Promise<Vec<Indexed<u16>>>,
}

impl ReadRegisters {
    pub(crate) fn new(request: AddressRange, promise: Promise<Vec<Indexed<u16>>>) -> Self {
        Self { request, promise }
    }

    pub(crate) fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        self.request.serialize(cursor)
    }

    pub(crate) fn failure(self, err: RequestError) {
        self.promise.failure(err)
    }

    pub(crate) fn handle_response(self, cursor: ReadCursor, decode: PduDecodeLevel) {
        match Self::parse_registers(self.request, cursor) {
            Ok(values) => {
                if decode.data_values() {
                    for x in values.iter() {
                        tracing::info!("index: {} value: {}", x.index, x.value);
                    }
                }
                self.promise.success(values)
            }
            Err(err) => self.promise.failure(err),
        }
    }

    fn parse_registers(
        request: AddressRange,
        mut cursor: ReadCursor,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        let byte_count = cursor.read_u8()? as usize;

        // how many bytes should the response have given the requested range?
        let expected = 2 * (request.count as usize);
        if byte_count != expected {
            return Err(AduParseError::RequestByteCountMismatch(expected, byte_count).into());
        }

        if byte_count != cursor.len() {
            return Err(
                AduParseError::InsufficientBytesForByteCount(byte_count, cursor.len()).into(),
            );
        }

        let mut values = Vec::with_capacity(request.count as usize);
        let mut index = request.start;
        while !cursor.is_empty() {
            values.push(Indexed::new(index, cursor.read_u16_be()?));
            index = index.wrapping_add(1);
        }

        Ok(values)
    }
}
