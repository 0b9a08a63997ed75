use std::time::Duration;

use crate::client::requests::read_registers::ReadRegisters;
use crate::client::requests::write_multiple::MultipleWriteRequest;
use crate::client::requests::write_single::SingleWrite;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::decode::PduDecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::exception::ExceptionCode;
use crate::types::{Indexed, RequestParam, UnitId};

pub(crate) enum Command {
    Setting(Setting),
    Request(Request),
}

pub(crate) enum Setting {
    DecodeLevel(crate::decode::DecodeLevel),
}

pub(crate) struct Request {
    pub(crate) id: UnitId,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) details: RequestDetails,
}

pub(crate) enum RequestDetails {
    ReadHoldingRegisters(ReadRegisters),
    ReadInputRegisters(ReadRegisters),
    WriteSingleCoil(SingleWrite<Indexed<bool>>),
    WriteSingleRegister(SingleWrite<Indexed<u16>>),
    WriteMultipleRegisters(MultipleWriteRequest),
}

impl Request {
    pub(crate) fn new(param: RequestParam, details: RequestDetails) -> Self {
        Self {
            id: param.id,
            timeout: param.response_timeout,
            max_retries: param.max_retries,
            details,
        }
    }

    pub(crate) fn fail(self, err: RequestError) {
        self.details.fail(err);
    }

    /// Route the response PDU based on its function byte: a matching code is
    /// parsed by the request type, `code | 0x80` carries an exception, and
    /// anything else fails the request
    pub(crate) fn handle_response(self, payload: &[u8], decode: PduDecodeLevel) {
        let expected = self.details.function();
        let mut cursor = ReadCursor::new(payload);

        let function = match cursor.read_u8() {
            Ok(x) => x,
            Err(err) => return self.details.fail(err.into()),
        };

        if function == expected.get_value() {
            if decode.enabled() {
                tracing::info!("PDU RX - {}", expected);
            }
            return self.details.handle_response(cursor, decode);
        }

        if function == expected.as_error() {
            let code = match cursor.read_u8() {
                Ok(x) => ExceptionCode::from(x),
                Err(err) => return self.details.fail(err.into()),
            };
            if decode.enabled() {
                tracing::warn!("PDU RX - {} exception: {}", expected, code);
            }
            return self.details.fail(code.into());
        }

        self.details.fail(
            AduParseError::UnknownResponseFunction(
                function,
                expected.get_value(),
                expected.as_error(),
            )
            .into(),
        )
    }
}

impl RequestDetails {
    pub(crate) fn function(&self) -> FunctionCode {
        match self {
            RequestDetails::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            RequestDetails::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            RequestDetails::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            RequestDetails::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            RequestDetails::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    pub(crate) fn fail(self, err: RequestError) {
        match self {
            RequestDetails::ReadHoldingRegisters(x) => x.failure(err),
            RequestDetails::ReadInputRegisters(x) => x.failure(err),
            RequestDetails::WriteSingleCoil(x) => x.failure(err),
            RequestDetails::WriteSingleRegister(x) => x.failure(err),
            RequestDetails::WriteMultipleRegisters(x) => x.failure(err),
        }
    }

    fn handle_response(self, cursor: ReadCursor, decode: PduDecodeLevel) {
        match self {
            RequestDetails::ReadHoldingRegisters(x) => x.handle_response(cursor, decode),
            RequestDetails::ReadInputRegisters(x) => x.handle_response(cursor, decode),
            RequestDetails::WriteSingleCoil(x) => x.handle_response(cursor),
            RequestDetails::WriteSingleRegister(x) => x.handle_response(cursor),
            RequestDetails::WriteMultipleRegisters(x) => x.handle_response(cursor),
        }
    }
}

impl Serialize for RequestDetails {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        match self {
            RequestDetails::ReadHoldingRegisters(x) => x.serialize(cursor),
            RequestDetails::ReadInputRegisters(x) => x.serialize(cursor),
            RequestDetails::WriteSingleCoil(x) => x.serialize(cursor),
            RequestDetails::WriteSingleRegister(x) => x.serialize(cursor),
            RequestDetails::WriteMultipleRegisters(x) => x.serialize(cursor),
        }
    }
}

pub(crate) struct Promise<T> {
    tx: tokio::sync::oneshot::Sender<Result<T, RequestError>>,
}

impl<T> Promise<T> {
    pub(crate) fn new(tx: tokio::sync::oneshot::Sender<Result<T, RequestError>>) -> Self {
        Self { tx }
    }

    pub(crate) fn failure(self, err: RequestError) {
        self.complete(Err(err))
    }

    pub(crate) fn success(self, value: T) {
        self.complete(Ok(value))
    }

    fn complete(self, result: Result<T, RequestError>) {
        if self.tx.send(result).is_err() {
            // the caller dropped the future that was awaiting the response
            tracing::debug!("response discarded because the requester is gone");
        }
    }
}
