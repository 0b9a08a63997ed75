use std::fmt::{Error, Formatter};

use crate::exception::ExceptionCode;

/// Errors that can be produced while making a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred on the underlying stream
    Io(std::io::ErrorKind),
    /// A frame-level error occurred while parsing the byte stream
    BadFrame(FrameParseError),
    /// A response was received but could not be interpreted
    BadResponse(AduParseError),
    /// The device reported an exception response
    Exception(ExceptionCode),
    /// The request could not be constructed from the supplied parameters
    BadRequest(InvalidRequest),
    /// A value could not be converted through the register schema
    BadValue(ValueError),
    /// No response was received within the retry budget
    ResponseTimeout,
    /// No connection exists to the device
    NoConnection,
    /// The task processing requests has been shut down
    Shutdown,
    /// An internal bug in the library, e.g. a serialization buffer overrun
    Internal(InternalError),
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            RequestError::Io(kind) => write!(f, "I/O error: {kind}"),
            RequestError::BadFrame(err) => write!(f, "bad frame: {err}"),
            RequestError::BadResponse(err) => write!(f, "bad response: {err}"),
            RequestError::Exception(code) => write!(f, "device exception: {code}"),
            RequestError::BadRequest(err) => write!(f, "invalid request: {err}"),
            RequestError::BadValue(err) => write!(f, "invalid value: {err}"),
            RequestError::ResponseTimeout => {
                f.write_str("timeout occurred before receiving a response from the device")
            }
            RequestError::NoConnection => f.write_str("no connection exists to the device"),
            RequestError::Shutdown => {
                f.write_str("the task processing requests has been shut down")
            }
            RequestError::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(code: ExceptionCode) -> Self {
        RequestError::Exception(code)
    }
}

impl From<InvalidRequest> for RequestError {
    fn from(err: InvalidRequest) -> Self {
        RequestError::BadRequest(err)
    }
}

impl From<ValueError> for RequestError {
    fn from(err: ValueError) -> Self {
        RequestError::BadValue(err)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

/// Errors that occur while parsing a frame off the stream
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    /// Received a frame with the MBAP length field set to zero
    MbapLengthZero,
    /// Received a frame with an MBAP length that exceeds the max allowed size (actual, max)
    MbapLengthTooBig(usize, usize),
    /// Received a frame with a non-Modbus protocol id
    UnknownProtocolId(u16),
    /// A payload CRC carried by a serial gateway did not match (expected, actual)
    CrcMismatch(u16, u16),
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            FrameParseError::MbapLengthZero => {
                f.write_str("received frame with the MBAP length field set to zero")
            }
            FrameParseError::MbapLengthTooBig(size, max) => write!(
                f,
                "received frame with MBAP length ({size}) that exceeds the max allowed size ({max})"
            ),
            FrameParseError::UnknownProtocolId(id) => {
                write!(f, "received frame with non-Modbus protocol id: {id}")
            }
            FrameParseError::CrcMismatch(expected, actual) => write!(
                f,
                "payload CRC mismatch: expected {expected:#06X}, received {actual:#06X}"
            ),
        }
    }
}

/// Errors that occur while parsing a response PDU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AduParseError {
    /// The response is too short to be valid
    InsufficientBytes,
    /// The byte count doesn't match what is expected based on the request (expected, actual)
    RequestByteCountMismatch(usize, usize),
    /// The byte count doesn't match the actual number of bytes present (count, remaining)
    InsufficientBytesForByteCount(usize, usize),
    /// The response contains extra trailing bytes
    TrailingBytes(usize),
    /// A parameter expected to be echoed in the reply did not match
    ReplyEchoMismatch,
    /// An unknown response function code was received (actual, expected, expected error)
    UnknownResponseFunction(u8, u8, u8),
    /// The response came back with a unit id different from the request (expected, actual)
    UnitIdMismatch(u8, u8),
    /// Bad value for a coil state
    UnknownCoilState(u16),
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::RequestByteCountMismatch(request, response) => write!(
                f,
                "byte count ({response}) doesn't match what is expected based on the request ({request})"
            ),
            AduParseError::InsufficientBytesForByteCount(count, remaining) => write!(
                f,
                "byte count ({count}) doesn't match the actual number of bytes remaining ({remaining})"
            ),
            AduParseError::TrailingBytes(remaining) => {
                write!(f, "response contains {remaining} extra trailing bytes")
            }
            AduParseError::ReplyEchoMismatch => {
                f.write_str("a parameter expected to be echoed in the reply did not match")
            }
            AduParseError::UnknownResponseFunction(actual, expected, error) => write!(
                f,
                "received unknown response function code: {actual}. Expected {expected} or {error}"
            ),
            AduParseError::UnitIdMismatch(expected, actual) => write!(
                f,
                "response unit id ({actual}) does not match the request ({expected})"
            ),
            AduParseError::UnknownCoilState(value) => write!(
                f,
                "received coil state with unspecified value: {value:#06X}"
            ),
        }
    }
}

/// Errors that result from bad request parameters
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    /// The request contains a count of zero
    CountOfZero,
    /// Start and count would overflow the u16 address space (start, count)
    AddressOverflow(u16, u16),
    /// The count exceeds the maximum allowed for this request type (count, max)
    CountTooBigForType(u16, u16),
}

impl std::error::Error for InvalidRequest {}

impl std::fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            InvalidRequest::CountOfZero => f.write_str("request contains a count of zero"),
            InvalidRequest::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count == {count} would overflow the representation of u16"
            ),
            InvalidRequest::CountTooBigForType(count, max) => write!(
                f,
                "the request count of {count} exceeds the maximum allowed count of {max} for this type"
            ),
        }
    }
}

/// Errors produced when converting values through the register schema
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The scaled integer does not fit the declared register width
    OutOfRange,
    /// The value variant does not match the declared register kind
    KindMismatch,
    /// The string is longer than the declared register width allows (length, max)
    StringTooLong(usize, usize),
    /// The number of raw words does not match the declared width (expected, actual)
    WidthMismatch(usize, usize),
    /// No register with the requested name exists in the schema
    UnknownRegister,
    /// The register is not a writable holding register
    NotWritable,
}

impl std::error::Error for ValueError {}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            ValueError::OutOfRange => {
                f.write_str("scaled integer does not fit the declared register width")
            }
            ValueError::KindMismatch => {
                f.write_str("value variant does not match the declared register kind")
            }
            ValueError::StringTooLong(len, max) => write!(
                f,
                "string of length {len} exceeds the declared register width of {max} bytes"
            ),
            ValueError::WidthMismatch(expected, actual) => write!(
                f,
                "expected {expected} raw words but received {actual}"
            ),
            ValueError::UnknownRegister => {
                f.write_str("no register with the requested name exists in the schema")
            }
            ValueError::NotWritable => f.write_str("register is not a writable holding register"),
        }
    }
}

/// Possible bugs in the library itself as it reads/writes buffers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// Attempted to write more bytes than allowed (write size, remaining)
    InsufficientWriteSpace(usize, usize),
    /// The calculated ADU size exceeds what is allowed by the spec (size, max)
    AduTooBig(usize, usize),
    /// Attempted to read more bytes than present (requested, remaining)
    InsufficientBytesForRead(usize, usize),
    /// A cursor seek operation exceeded the bounds of the underlying buffer
    BadSeekOperation,
    /// The byte count would exceed the maximum size of a u8
    BadByteCount(usize),
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            InternalError::InsufficientWriteSpace(write_size, remaining) => write!(
                f,
                "attempted to write {write_size} bytes with {remaining} bytes remaining"
            ),
            InternalError::AduTooBig(size, max) => write!(
                f,
                "ADU length of {size} exceeds the maximum allowed length of {max}"
            ),
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
            InternalError::BadSeekOperation => {
                f.write_str("cursor seek operation exceeded the bounds of the underlying buffer")
            }
            InternalError::BadByteCount(num) => {
                write!(f, "byte count would exceed the maximum size of u8: {num}")
            }
        }
    }
}
