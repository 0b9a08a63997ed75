use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::client::channel::{spawn_tcp_client_task, Channel};
use crate::decode::DecodeLevel;
use crate::error::{RequestError, ValueError};
use crate::retry::RetryStrategy;
use crate::schema::{InverterState, RegisterSchema, RegisterSpace, RegisterValue};
use crate::types::{AddressRange, Indexed, RequestParam, WriteMultiple};

/// Spawn a connection task for a device at `addr` and return a [`Connection`]
/// that reads and writes through the given register schema
pub fn connect(
    addr: SocketAddr,
    schema: &'static RegisterSchema,
    max_queued_requests: usize,
    connect_retry: Box<dyn RetryStrategy>,
    decode: DecodeLevel,
) -> Connection {
    Connection {
        channel: spawn_tcp_client_task(addr, max_queued_requests, connect_retry, decode),
        schema,
    }
}

/// Schema-aware handle to a device. Wraps a [`Channel`] and converts between
/// raw register words and named, typed values.
#[derive(Debug, Clone)]
pub struct Connection {
    channel: Channel,
    schema: &'static RegisterSchema,
}

impl Connection {
    /// Read a register range and decode every schema field fully contained
    /// in it into a timestamped [`InverterState`] snapshot. Either all
    /// covered fields decode or the read fails as a whole.
    pub async fn read_registers(
        &mut self,
        param: RequestParam,
        space: RegisterSpace,
        range: AddressRange,
    ) -> Result<InverterState, RequestError> {
        let values = match space {
            RegisterSpace::Holding => self.channel.read_holding_registers(param, range).await?,
            RegisterSpace::Input => self.channel.read_input_registers(param, range).await?,
        };

        let mut decoded = BTreeMap::new();
        for def in self.schema.contained_in(space, range) {
            let offset = (def.address - range.start) as usize;
            let words: Vec<u16> = match values.get(offset..offset + def.width() as usize) {
                Some(slice) => slice.iter().map(|x| x.value).collect(),
                None => {
                    return Err(crate::error::InternalError::InsufficientBytesForRead(
                        def.width() as usize,
                        values.len().saturating_sub(offset),
                    )
                    .into())
                }
            };
            decoded.insert(def.name, def.decode(&words)?);
        }

        Ok(InverterState::new(decoded))
    }

    /// Encode a value through the schema and write it to the named holding
    /// register, using a single-register write when the field is one word
    /// wide and a multi-register write otherwise
    pub async fn write_register(
        &mut self,
        param: RequestParam,
        name: &str,
        value: &RegisterValue,
    ) -> Result<(), RequestError> {
        let def = match self.schema.find(name) {
            Some(def) => def,
            None => return Err(ValueError::UnknownRegister.into()),
        };

        if def.space != RegisterSpace::Holding || !def.writable {
            return Err(ValueError::NotWritable.into());
        }

        let words = def.encode(value)?;
        match words.as_slice() {
            [single] => {
                self.channel
                    .write_single_register(param, Indexed::new(def.address, *single))
                    .await?;
            }
            _ => {
                let request = WriteMultiple::try_from(def.address, words)?;
                self.channel.write_multiple_registers(param, request).await?;
            }
        }

        Ok(())
    }

    /// Write a single coil, validating the device echo
    pub async fn write_coil(
        &mut self,
        param: RequestParam,
        value: Indexed<bool>,
    ) -> Result<Indexed<bool>, RequestError> {
        self.channel.write_single_coil(param, value).await
    }

    /// Change the decode level of the running connection task
    pub async fn set_decode_level(&mut self, level: DecodeLevel) -> Result<(), RequestError> {
        self.channel.set_decode_level(level).await
    }

    /// The schema this connection decodes through
    pub fn schema(&self) -> &'static RegisterSchema {
        self.schema
    }

    /// The underlying channel, for raw register operations outside the schema
    pub fn channel(&mut self) -> &mut Channel {
        &mut self.channel
    }

    /// Drop this handle. When the last handle to the connection is dropped,
    /// the background task shuts down and any in-flight requests resolve
    /// with [`RequestError::Shutdown`].
    pub fn close(self) {}
}
