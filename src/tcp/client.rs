use std::net::SocketAddr;

use crate::client::message::Command;
use crate::client::task::{ClientLoop, SessionError};
use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::retry::RetryStrategy;

/// Task that owns the TCP connection to the device: connects, hands the
/// socket to the client loop, and reconnects with backoff when the
/// connection is lost. Runs until every channel handle is dropped.
pub(crate) struct TcpChannelTask {
    addr: SocketAddr,
    connect_retry: Box<dyn RetryStrategy>,
    client_loop: ClientLoop,
}

impl TcpChannelTask {
    pub(crate) fn new(
        addr: SocketAddr,
        rx: tokio::sync::mpsc::Receiver<Command>,
        connect_retry: Box<dyn RetryStrategy>,
        decode: DecodeLevel,
    ) -> Self {
        Self {
            addr,
            connect_retry,
            client_loop: ClientLoop::new(rx, decode),
        }
    }

    pub(crate) async fn run(&mut self) {
        loop {
            match tokio::net::TcpStream::connect(self.addr).await {
                Err(err) => {
                    let delay = self.connect_retry.after_failed_connect();
                    tracing::warn!(
                        "failed to connect to {}: {} - waiting {} ms before next attempt",
                        self.addr,
                        err,
                        delay.as_millis()
                    );
                    if self.client_loop.fail_requests_for(delay).await.is_err() {
                        return;
                    }
                }
                Ok(socket) => {
                    tracing::info!("connected to: {}", self.addr);
                    self.connect_retry.reset();

                    let mut phys = PhysLayer::new_tcp(socket);
                    match self.client_loop.run(&mut phys).await {
                        SessionError::Shutdown => {
                            tracing::info!("channel shut down");
                            return;
                        }
                        err => {
                            let delay = self.connect_retry.after_disconnect();
                            tracing::warn!(
                                "connection lost: {:?} - waiting {} ms before reconnecting",
                                err,
                                delay.as_millis()
                            );
                            if self.client_loop.fail_requests_for(delay).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}
