use std::time::Duration;

use crate::constants::limits;
use crate::error::{AduParseError, InvalidRequest};

/// Modbus unit identifier, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

impl UnitId {
    /// create a new unit id from a raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

/// Start and count tuple used when making various requests.
/// Cannot be constructed with an invalid start/count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Create a new address range, validating that the count is non-zero and
    /// that `start + count` does not overflow the u16 address space
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRequest> {
        if count == 0 {
            return Err(InvalidRequest::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);
        if start > max_start {
            return Err(InvalidRequest::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    pub(crate) fn limited_to(self, max_count: u16) -> Result<Self, InvalidRequest> {
        if self.count > max_count {
            return Err(InvalidRequest::CountTooBigForType(self.count, max_count));
        }
        Ok(self)
    }

    pub(crate) fn of_read_registers(self) -> Result<Self, InvalidRequest> {
        self.limited_to(limits::MAX_READ_REGISTERS_COUNT)
    }

    pub(crate) fn of_write_registers(self) -> Result<Self, InvalidRequest> {
        self.limited_to(limits::MAX_WRITE_REGISTERS_COUNT)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "start: {:#06X} count: {}",
            self.start, self.count
        )
    }
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

impl<T> Indexed<T> {
    /// create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl<T> From<(u16, T)> for Indexed<T>
where
    T: Copy,
{
    fn from(tuple: (u16, T)) -> Self {
        let (index, value) = tuple;
        Self::new(index, value)
    }
}

/// Collection of values and a starting address used when writing multiple registers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteMultiple {
    pub(crate) range: AddressRange,
    pub(crate) values: Vec<u16>,
}

impl WriteMultiple {
    /// Create a new collection of values, validating the implied address range
    pub fn try_from(start: u16, values: Vec<u16>) -> Result<Self, InvalidRequest> {
        let count = match u16::try_from(values.len()) {
            Ok(count) => count,
            Err(_) => {
                return Err(InvalidRequest::CountTooBigForType(
                    u16::MAX,
                    limits::MAX_WRITE_REGISTERS_COUNT,
                ))
            }
        };
        let range = AddressRange::try_from(start, count)?.of_write_registers()?;
        Ok(Self { range, values })
    }

    /// The address range implied by the starting address and number of values
    pub fn range(&self) -> AddressRange {
        self.range
    }
}

/// Parameters common to every request: target unit id, response timeout, and
/// how many times an unanswered request is retransmitted before failing with
/// [`crate::error::RequestError::ResponseTimeout`]. The total number of
/// attempts is always `max_retries + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestParam {
    /// unit id of the remote device
    pub id: UnitId,
    /// response timeout applied to each attempt
    pub response_timeout: Duration,
    /// maximum number of retransmissions after the first attempt
    pub max_retries: usize,
}

impl RequestParam {
    /// create a request parameter with no retransmissions
    pub fn new(id: UnitId, response_timeout: Duration) -> Self {
        Self {
            id,
            response_timeout,
            max_retries: 0,
        }
    }

    /// set the number of retransmissions attempted after the first try
    pub fn with_max_retries(self, max_retries: usize) -> Self {
        Self {
            max_retries,
            ..self
        }
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, AduParseError> {
    match value {
        crate::constants::coil::ON => Ok(true),
        crate::constants::coil::OFF => Ok(false),
        _ => Err(AduParseError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        crate::constants::coil::ON
    } else {
        crate::constants::coil::OFF
    }
}
