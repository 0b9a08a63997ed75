use crate::client::message::Promise;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::serialize::Parse;
use crate::common::traits::Serialize;
use crate::error::{AduParseError, RequestError};
use crate::types::{AddressRange, WriteMultiple};

/// Write of multiple contiguous registers. The reply echoes the address
/// range that was written.
pub(crate) struct MultipleWriteRequest {
    request: WriteMultiple,
    promise: Promise<AddressRange>,
}

impl MultipleWriteRequest {
    pub(crate) fn new(request: WriteMultiple, promise: Promise<AddressRange>) -> Self {
        Self { request, promise }
    }

    pub(crate) fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        self.request.serialize(cursor)
    }

    pub(crate) fn failure(self, err: RequestError) {
        self.promise.failure(err)
    }

    pub(crate) fn handle_response(self, cursor: ReadCursor) {
        match Self::parse_echo(self.request.range(), cursor) {
            Ok(range) => self.promise.success(range),
            Err(err) => self.promise.failure(err),
        }
    }

    fn parse_echo(request: AddressRange, mut cursor: ReadCursor) -> Result<AddressRange, RequestError> {
        let response = AddressRange::parse(&mut cursor)?;
        cursor.expect_empty()?;

        if response != request {
            return Err(AduParseError::ReplyEchoMismatch.into());
        }

        Ok(response)
    }
}
