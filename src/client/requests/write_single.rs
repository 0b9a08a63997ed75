use crate::client::message::Promise;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::serialize::Parse;
use crate::common::traits::Serialize;
use crate::error::{AduParseError, RequestError};

/// Write of a single register or coil. The reply must echo the request
/// exactly, otherwise the write is not considered confirmed.
pub(crate) struct SingleWrite<T>
where
    T: Serialize + Parse + PartialEq + Copy,
{
    request: T,
    promise: Promise<T>,
}

impl<T> SingleWrite<T>
where
    T: Serialize + Parse + PartialEq + Copy,
{
    pub(crate) fn new(request: T, promise: Promise<T>) -> Self {
        Self { request, promise }
    }

    pub(crate) fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        self.request.serialize(cursor)
    }

    pub(crate) fn failure(self, err: RequestError) {
        self.promise.failure(err)
    }

    pub(crate) fn handle_response(self, cursor: ReadCursor) {
        match Self::parse_echo(self.request, cursor) {
            Ok(echo) => self.promise.success(echo),
            Err(err) => self.promise.failure(err),
        }
    }

    fn parse_echo(request: T, mut cursor: ReadCursor) -> Result<T, RequestError> {
        let response = T::parse(&mut cursor)?;
        cursor.expect_empty()?;

        if response != request {
            return Err(AduParseError::ReplyEchoMismatch.into());
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Indexed;

    #[test]
    fn accepts_exact_echo() {
        let request = Indexed::new(0x0075, 0x0050);
        assert_eq!(
            SingleWrite::parse_echo(request, ReadCursor::new(&[0x00, 0x75, 0x00, 0x50])),
            Ok(request)
        );
    }

    #[test]
    fn rejects_echo_with_different_value() {
        let request = Indexed::new(0x0075, 0x0050);
        assert_eq!(
            SingleWrite::parse_echo(request, ReadCursor::new(&[0x00, 0x75, 0x00, 0x51])),
            Err(AduParseError::ReplyEchoMismatch.into())
        );
    }

    #[test]
    fn rejects_echo_with_trailing_bytes() {
        let request = Indexed::new(0x0075, 0x0050);
        assert_eq!(
            SingleWrite::parse_echo(request, ReadCursor::new(&[0x00, 0x75, 0x00, 0x50, 0xFF])),
            Err(AduParseError::TrailingBytes(1).into())
        );
    }
}
