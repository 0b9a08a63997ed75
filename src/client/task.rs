use std::time::Duration;

use tokio::time::Instant;

use crate::client::message::{Command, Request, Setting};
use crate::client::pending::{Pending, PendingRequests};
use crate::common::cursor::WriteCursor;
use crate::common::frame::{constant, Frame, FrameHeader, FramedReader};
use crate::common::phys::PhysLayer;
use crate::common::traits::Serialize;
use crate::decode::DecodeLevel;
use crate::error::{AduParseError, FrameParseError, RequestError};
use crate::tcp::frame::{MbapFormatter, MbapParser};

/// Errors that terminate a session with a particular connection
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionError {
    /// An I/O error on the underlying stream
    IoError(std::io::ErrorKind),
    /// Unrecoverable framing error
    BadFrame(FrameParseError),
    /// Channel was closed by the user
    Shutdown,
}

impl SessionError {
    fn from(err: &RequestError) -> Option<Self> {
        match err {
            RequestError::Io(x) => Some(SessionError::IoError(*x)),
            RequestError::BadFrame(x) => Some(SessionError::BadFrame(*x)),
            RequestError::Shutdown => Some(SessionError::Shutdown),
            _ => None,
        }
    }

    fn to_request_error(self) -> RequestError {
        match self {
            SessionError::IoError(kind) => RequestError::Io(kind),
            SessionError::BadFrame(err) => RequestError::BadFrame(err),
            SessionError::Shutdown => RequestError::Shutdown,
        }
    }
}

/// Marker type returned when the command channel closes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Shutdown;

pub(crate) struct ClientLoop {
    rx: tokio::sync::mpsc::Receiver<Command>,
    formatter: MbapFormatter,
    reader: FramedReader<MbapParser>,
    pending: PendingRequests,
    decode: DecodeLevel,
}

impl ClientLoop {
    pub(crate) fn new(rx: tokio::sync::mpsc::Receiver<Command>, decode: DecodeLevel) -> Self {
        Self {
            rx,
            formatter: MbapFormatter::new(),
            reader: FramedReader::new(MbapParser::new()),
            pending: PendingRequests::new(),
            decode,
        }
    }

    /// Run a session over a connected socket until the connection fails or
    /// the channel shuts down. Every request still outstanding when the
    /// session ends fails with the session error.
    pub(crate) async fn run(&mut self, io: &mut PhysLayer) -> SessionError {
        let err = loop {
            match self.poll(io).await {
                Ok(()) => continue,
                Err(err) => break err,
            }
        };

        self.pending.fail_all(err.to_request_error());
        self.reader.reset();
        err
    }

    async fn poll(&mut self, io: &mut PhysLayer) -> Result<(), SessionError> {
        tokio::select! {
            frame = self.reader.next_frame(io, self.decode) => {
                match frame {
                    Ok(frame) => {
                        self.handle_frame(frame);
                        Ok(())
                    }
                    Err(err) => Err(Self::session_error(&err)),
                }
            }
            cmd = self.rx.recv() => {
                match cmd {
                    None => Err(SessionError::Shutdown),
                    Some(Command::Setting(setting)) => {
                        self.change_setting(setting);
                        Ok(())
                    }
                    Some(Command::Request(request)) => self.start_request(request, io).await,
                }
            }
            _ = Self::sleep_until(self.pending.next_deadline()) => {
                self.retry_expired(io).await
            }
        }
    }

    async fn sleep_until(deadline: Option<Instant>) {
        match deadline {
            Some(x) => tokio::time::sleep_until(x).await,
            // no deadlines to track, wait forever on this branch
            None => std::future::pending().await,
        }
    }

    fn session_error(err: &RequestError) -> SessionError {
        match SessionError::from(err) {
            Some(x) => x,
            // other request errors don't break the session
            None => SessionError::IoError(std::io::ErrorKind::InvalidData),
        }
    }

    /// Serialize the request, write it to the socket, and track it in the
    /// pending table. Serialization failures fail only this request; write
    /// failures end the session.
    async fn start_request(
        &mut self,
        request: Request,
        io: &mut PhysLayer,
    ) -> Result<(), SessionError> {
        let mut pdu = [0u8; constant::MAX_ADU_LENGTH];
        let pdu_len = {
            let mut cursor = WriteCursor::new(pdu.as_mut());
            let result = cursor
                .write_u8(request.details.function().get_value())
                .map_err(RequestError::from)
                .and_then(|()| request.details.serialize(&mut cursor));
            match result {
                Ok(()) => cursor.position(),
                Err(err) => {
                    request.fail(err);
                    return Ok(());
                }
            }
        };

        let tx_id = self.pending.allocate();
        let header = FrameHeader::new(request.id, tx_id);

        if self.decode.pdu.enabled() {
            tracing::info!("PDU TX - {} tx_id: {}", request.details.function(), tx_id);
        }

        let bytes = match self
            .formatter
            .format_raw(header, &pdu[..pdu_len], self.decode.adu)
        {
            Ok(bytes) => bytes,
            Err(err) => {
                request.fail(err);
                return Ok(());
            }
        };

        if let Err(err) = io.write(bytes, self.decode.physical).await {
            let err = RequestError::from(err);
            let session_err = Self::session_error(&err);
            request.fail(err);
            return Err(session_err);
        }

        let deadline = Instant::now() + request.timeout;
        let retries_left = request.max_retries;
        self.pending.insert(
            tx_id,
            Pending {
                request,
                pdu: pdu[..pdu_len].to_vec(),
                deadline,
                retries_left,
            },
        );

        Ok(())
    }

    /// Correlate a received frame with an outstanding request by tx id
    fn handle_frame(&mut self, frame: Frame) {
        let tx_id = frame.header.tx_id;

        let pending = match self.pending.remove(tx_id) {
            Some(x) => x,
            None => {
                // normal after a retransmission if the reply to an earlier
                // attempt arrives late, and some devices emit unsolicited frames
                tracing::warn!("discarding frame with unknown tx_id: {}", tx_id);
                return;
            }
        };

        if frame.header.unit_id != pending.request.id {
            tracing::warn!(
                "expected response unit id: {} received: {}",
                pending.request.id,
                frame.header.unit_id
            );
            let err =
                AduParseError::UnitIdMismatch(pending.request.id.value, frame.header.unit_id.value);
            pending.request.fail(err.into());
            return;
        }

        pending.request.handle_response(frame.payload(), self.decode.pdu);
    }

    /// Handle requests whose response deadline has passed: retransmit under
    /// a fresh tx id while retries remain, otherwise fail with a timeout
    async fn retry_expired(&mut self, io: &mut PhysLayer) -> Result<(), SessionError> {
        let now = Instant::now();

        let mut expired = self.pending.pop_expired(now).into_iter();
        while let Some(mut pending) = expired.next() {
            if pending.retries_left == 0 {
                tracing::warn!("no response from unit {} within the retry budget", pending.request.id);
                pending.request.fail(RequestError::ResponseTimeout);
                continue;
            }

            pending.retries_left -= 1;
            let tx_id = self.pending.allocate();
            let header = FrameHeader::new(pending.request.id, tx_id);

            tracing::warn!(
                "response timeout, retransmitting with tx_id: {} ({} retries left)",
                tx_id,
                pending.retries_left
            );

            let bytes = match self
                .formatter
                .format_raw(header, &pending.pdu, self.decode.adu)
            {
                Ok(bytes) => bytes,
                Err(err) => {
                    pending.request.fail(err);
                    continue;
                }
            };

            if let Err(err) = io.write(bytes, self.decode.physical).await {
                let err = RequestError::from(err);
                let session_err = Self::session_error(&err);
                // requests already popped from the table won't be reached by
                // the fail_all in run(), so fail them here
                pending.request.fail(err);
                for remaining in expired {
                    remaining.request.fail(err);
                }
                return Err(session_err);
            }

            pending.deadline = now + pending.request.timeout;
            self.pending.insert(tx_id, pending);
        }

        Ok(())
    }

    fn change_setting(&mut self, setting: Setting) {
        match setting {
            Setting::DecodeLevel(level) => {
                tracing::info!("decode level changed: {:?}", level);
                self.decode = level;
            }
        }
    }

    /// While disconnected, fail incoming requests immediately rather than
    /// queueing them against a connection that may never come back
    pub(crate) async fn fail_requests_for(&mut self, duration: Duration) -> Result<(), Shutdown> {
        let deadline = Instant::now() + duration;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                // timeout elapsed, resume connecting
                Err(_) => return Ok(()),
                Ok(None) => return Err(Shutdown),
                Ok(Some(Command::Setting(setting))) => self.change_setting(setting),
                Ok(Some(Command::Request(request))) => {
                    request.fail(RequestError::NoConnection)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::client::message::{Promise, Request, RequestDetails};
    use crate::client::requests::read_registers::ReadRegisters;
    use crate::types::{AddressRange, Indexed, RequestParam, UnitId};

    fn read_request(
        start: u16,
        param: RequestParam,
    ) -> (
        Command,
        tokio::sync::oneshot::Receiver<Result<Vec<Indexed<u16>>, RequestError>>,
    ) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let range = AddressRange::try_from(start, 1).unwrap();
        let request = Request::new(
            param,
            RequestDetails::ReadHoldingRegisters(ReadRegisters::new(range, Promise::new(tx))),
        );
        (Command::Request(request), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_retransmission_write_fails_every_expired_request() {
        let param = RequestParam::new(UnitId::new(0x2A), Duration::from_millis(10))
            .with_max_retries(1);

        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::channel(16);
        let (cmd_a, mut rx_a) = read_request(0, param);
        let (cmd_b, mut rx_b) = read_request(5, param);
        cmd_tx.send(cmd_a).await.unwrap();
        cmd_tx.send(cmd_b).await.unwrap();

        // both initial writes succeed, the first retransmission write fails
        let io = tokio_test::io::Builder::new()
            .write(&[
                0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x2A, 0x03, 0x00, 0x00, 0x00, 0x01,
            ])
            .write(&[
                0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x2A, 0x03, 0x00, 0x05, 0x00, 0x01,
            ])
            .write_error(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .build();
        let mut phys = PhysLayer::new_mock(io);

        let mut client_loop = ClientLoop::new(cmd_rx, DecodeLevel::nothing());
        let err = client_loop.run(&mut phys).await;
        assert_eq!(err, SessionError::IoError(std::io::ErrorKind::BrokenPipe));

        // both expired requests observe the connection error, not a shutdown
        assert_eq!(
            rx_a.try_recv().unwrap(),
            Err(RequestError::Io(std::io::ErrorKind::BrokenPipe))
        );
        assert_eq!(
            rx_b.try_recv().unwrap(),
            Err(RequestError::Io(std::io::ErrorKind::BrokenPipe))
        );

        drop(cmd_tx);
    }
}
