use std::net::SocketAddr;

use crate::client::message::{Command, Promise, Request, RequestDetails, Setting};
use crate::client::requests::read_registers::ReadRegisters;
use crate::client::requests::write_multiple::MultipleWriteRequest;
use crate::client::requests::write_single::SingleWrite;
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::retry::RetryStrategy;
use crate::tcp::client::TcpChannelTask;
use crate::types::{AddressRange, Indexed, RequestParam, WriteMultiple};

/// Spawn the task that drives a TCP connection and return a [`Channel`]
/// used to make requests on it.
///
/// The task connects lazily and reconnects automatically using the supplied
/// [`RetryStrategy`]. It runs until every clone of the returned channel is
/// dropped.
pub fn spawn_tcp_client_task(
    addr: SocketAddr,
    max_queued_requests: usize,
    connect_retry: Box<dyn RetryStrategy>,
    decode: DecodeLevel,
) -> Channel {
    let (tx, rx) = tokio::sync::mpsc::channel(max_queued_requests);
    let mut task = TcpChannelTask::new(addr, rx, connect_retry, decode);
    tokio::spawn(async move { task.run().await });
    Channel { tx }
}

/// Handle used to make requests on an underlying connection
#[derive(Debug, Clone)]
pub struct Channel {
    tx: tokio::sync::mpsc::Sender<Command>,
}

impl Channel {
    /// Read a range of holding registers (function code 0x03)
    pub async fn read_holding_registers(
        &mut self,
        param: RequestParam,
        range: AddressRange,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        let range = range.of_read_registers()?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let details =
            RequestDetails::ReadHoldingRegisters(ReadRegisters::new(range, Promise::new(tx)));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Read a range of input registers (function code 0x04)
    pub async fn read_input_registers(
        &mut self,
        param: RequestParam,
        range: AddressRange,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        let range = range.of_read_registers()?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let details =
            RequestDetails::ReadInputRegisters(ReadRegisters::new(range, Promise::new(tx)));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Write a single coil (function code 0x05). The reply must echo the
    /// request exactly for the write to be considered confirmed.
    pub async fn write_single_coil(
        &mut self,
        param: RequestParam,
        value: Indexed<bool>,
    ) -> Result<Indexed<bool>, RequestError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let details = RequestDetails::WriteSingleCoil(SingleWrite::new(value, Promise::new(tx)));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Write a single holding register (function code 0x06). The reply must
    /// echo the request exactly for the write to be considered confirmed.
    pub async fn write_single_register(
        &mut self,
        param: RequestParam,
        value: Indexed<u16>,
    ) -> Result<Indexed<u16>, RequestError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let details =
            RequestDetails::WriteSingleRegister(SingleWrite::new(value, Promise::new(tx)));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Write multiple contiguous holding registers (function code 0x10),
    /// returning the range echoed by the device
    pub async fn write_multiple_registers(
        &mut self,
        param: RequestParam,
        request: WriteMultiple,
    ) -> Result<AddressRange, RequestError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let details =
            RequestDetails::WriteMultipleRegisters(MultipleWriteRequest::new(request, Promise::new(tx)));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// Change the decode level of the running task
    pub async fn set_decode_level(&mut self, level: DecodeLevel) -> Result<(), RequestError> {
        self.tx
            .send(Command::Setting(Setting::DecodeLevel(level)))
            .await
            .map_err(|_| RequestError::Shutdown)
    }

    async fn send(&mut self, request: Request) -> Result<(), RequestError> {
        self.tx
            .send(Command::Request(request))
            .await
            .map_err(|_| RequestError::Shutdown)
    }
}
