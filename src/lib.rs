//! An async implementation of the Modbus TCP client protocol for talking
//! directly to solar inverters, using [Tokio](https://docs.rs/tokio) and
//! Rust's `async/await` syntax.
//!
//! # Features
//!
//! * Automatic connection management with configurable reconnect strategy
//! * Panic-free parsing
//! * Multiple outstanding requests per connection (Modbus TCP pipelining),
//!   correlated by transaction id
//! * Per-request response timeout and retransmission budget
//! * A register schema that converts raw 16-bit words into typed, named
//!   engineering values and back
//!
//! # Supported functions
//!
//! * Read Holding Registers (0x03)
//! * Read Input Registers (0x04)
//! * Write Single Coil (0x05)
//! * Write Single Register (0x06)
//! * Write Multiple Registers (0x10)
//!
//! # Example
//!
//! A client that reads some input registers through the built-in inverter
//! schema:
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::str::FromStr;
//! use std::time::Duration;
//!
//! use solbus::client::connect;
//! use solbus::decode::DecodeLevel;
//! use solbus::retry::default_retry_strategy;
//! use solbus::schema::{inverter, RegisterSpace};
//! use solbus::types::{AddressRange, RequestParam};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connection = connect(
//!         SocketAddr::from_str("192.168.0.20:502")?,
//!         inverter::schema(),
//!         16,
//!         default_retry_strategy(),
//!         DecodeLevel::default(),
//!     );
//!
//!     let param = RequestParam::new(inverter::DEFAULT_UNIT_ID, Duration::from_secs(1))
//!         .with_max_retries(2);
//!
//!     let state = connection
//!         .read_registers(param, RegisterSpace::Input, AddressRange::try_from(0, 60)?)
//!         .await?;
//!
//!     for (name, value) in state.iter() {
//!         println!("{name} = {value}");
//!     }
//!
//!     Ok(())
//! }
//! ```

/// client API: channel, facade and the task that drives the connection
pub mod client;
/// runtime-configurable protocol decode logging
pub mod decode;
/// error types associated with making requests
pub mod error;
/// Modbus exception codes
pub mod exception;
/// reconnection strategies
pub mod retry;
/// register schema: typed definitions, scaling and the inverter table
pub mod schema;
/// basic protocol types used throughout the API
pub mod types;

pub(crate) mod constants;

mod common {
    pub(crate) mod buffer;
    pub(crate) mod cursor;
    pub(crate) mod frame;
    pub(crate) mod function;
    pub(crate) mod phys;
    pub(crate) mod serialize;
    pub(crate) mod traits;
}

mod tcp {
    pub(crate) mod client;
    pub(crate) mod frame;
}
