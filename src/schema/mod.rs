//! Typed register schema that converts between raw 16-bit register words and
//! named engineering values.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::error::ValueError;
use crate::types::AddressRange;

pub mod inverter;

/// The two register spaces a definition can live in
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterSpace {
    /// Read/write registers (function codes 0x03 / 0x06 / 0x10)
    Holding,
    /// Read-only measurement registers (function code 0x04)
    Input,
}

/// How the raw words of a register are interpreted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterKind {
    /// One word, unsigned
    U16,
    /// One word, two's complement signed
    I16,
    /// Two words, big-endian unsigned
    U32,
    /// One word of independent flag bits
    Bitfield,
    /// ASCII text packed two characters per word, the given number of words wide
    Ascii(u8),
}

/// Decimal scaling applied to an integer register to obtain its engineering value
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scale {
    /// raw value is the engineering value
    Unit,
    /// engineering value = raw / 10
    Deci,
    /// engineering value = raw / 100
    Centi,
    /// engineering value = raw / 1000
    Milli,
}

impl Scale {
    pub(crate) fn denominator(self) -> f64 {
        match self {
            Scale::Unit => 1.0,
            Scale::Deci => 10.0,
            Scale::Centi => 100.0,
            Scale::Milli => 1000.0,
        }
    }
}

/// A decoded register value, tagged by interpretation
#[derive(Clone, Debug, PartialEq)]
pub enum RegisterValue {
    /// Unscaled unsigned integer
    Unsigned(u64),
    /// Unscaled signed integer
    Signed(i64),
    /// Scaled value
    Scaled(f64),
    /// Raw flag bits
    Bitfield(u16),
    /// ASCII text with trailing NULs trimmed
    Text(String),
}

impl std::fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterValue::Unsigned(x) => write!(f, "{x}"),
            RegisterValue::Signed(x) => write!(f, "{x}"),
            RegisterValue::Scaled(x) => write!(f, "{x}"),
            RegisterValue::Bitfield(x) => write!(f, "{x:#018b}"),
            RegisterValue::Text(x) => f.write_str(x),
        }
    }
}

/// Static description of a single named register
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RegisterDefinition {
    /// Field name, unique within the schema
    pub name: &'static str,
    /// Register space the definition lives in
    pub space: RegisterSpace,
    /// Address of the first word
    pub address: u16,
    /// Interpretation of the raw words
    pub kind: RegisterKind,
    /// Scaling applied to integer kinds
    pub scale: Scale,
    /// Whether the register accepts writes. Only meaningful for holding registers.
    pub writable: bool,
}

impl RegisterDefinition {
    /// Number of 16-bit words the register occupies
    pub fn width(&self) -> u16 {
        match self.kind {
            RegisterKind::U16 | RegisterKind::I16 | RegisterKind::Bitfield => 1,
            RegisterKind::U32 => 2,
            RegisterKind::Ascii(words) => words as u16,
        }
    }

    /// Decode raw words into a typed value. The slice must be exactly
    /// [`width`](Self::width) words long.
    pub fn decode(&self, words: &[u16]) -> Result<RegisterValue, ValueError> {
        if words.len() != self.width() as usize {
            return Err(ValueError::WidthMismatch(self.width() as usize, words.len()));
        }

        match self.kind {
            RegisterKind::U16 => Ok(self.apply_scale_unsigned(words[0] as u64)),
            RegisterKind::I16 => Ok(self.apply_scale_signed(words[0] as i16 as i64)),
            RegisterKind::U32 => {
                let raw = ((words[0] as u32) << 16) | (words[1] as u32);
                Ok(self.apply_scale_unsigned(raw as u64))
            }
            RegisterKind::Bitfield => Ok(RegisterValue::Bitfield(words[0])),
            RegisterKind::Ascii(_) => {
                // the full declared width is always consumed, NUL is padding
                // rather than a terminator
                let mut bytes = Vec::with_capacity(words.len() * 2);
                for word in words {
                    bytes.push((word >> 8) as u8);
                    bytes.push(*word as u8);
                }
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
                Ok(RegisterValue::Text(
                    String::from_utf8_lossy(&bytes).into_owned(),
                ))
            }
        }
    }

    /// Encode a typed value into raw words, validating that the value
    /// variant matches the register kind and fits its declared width
    pub fn encode(&self, value: &RegisterValue) -> Result<Vec<u16>, ValueError> {
        match (self.kind, value) {
            (RegisterKind::U16, value) => {
                let raw = self.unscale_unsigned(value)?;
                match u16::try_from(raw) {
                    Ok(x) => Ok(vec![x]),
                    Err(_) => Err(ValueError::OutOfRange),
                }
            }
            (RegisterKind::I16, value) => {
                let raw = self.unscale_signed(value)?;
                match i16::try_from(raw) {
                    Ok(x) => Ok(vec![x as u16]),
                    Err(_) => Err(ValueError::OutOfRange),
                }
            }
            (RegisterKind::U32, value) => {
                let raw = self.unscale_unsigned(value)?;
                match u32::try_from(raw) {
                    Ok(x) => Ok(vec![(x >> 16) as u16, x as u16]),
                    Err(_) => Err(ValueError::OutOfRange),
                }
            }
            (RegisterKind::Bitfield, RegisterValue::Bitfield(bits)) => Ok(vec![*bits]),
            (RegisterKind::Ascii(words), RegisterValue::Text(text)) => {
                let max = (words as usize) * 2;
                if !text.is_ascii() {
                    return Err(ValueError::KindMismatch);
                }
                if text.len() > max {
                    return Err(ValueError::StringTooLong(text.len(), max));
                }

                let mut bytes = text.as_bytes().to_vec();
                bytes.resize(max, 0);

                Ok(bytes
                    .chunks_exact(2)
                    .map(|pair| ((pair[0] as u16) << 8) | pair[1] as u16)
                    .collect())
            }
            _ => Err(ValueError::KindMismatch),
        }
    }

    fn apply_scale_unsigned(&self, raw: u64) -> RegisterValue {
        match self.scale {
            Scale::Unit => RegisterValue::Unsigned(raw),
            scale => RegisterValue::Scaled(raw as f64 / scale.denominator()),
        }
    }

    fn apply_scale_signed(&self, raw: i64) -> RegisterValue {
        match self.scale {
            Scale::Unit => RegisterValue::Signed(raw),
            scale => RegisterValue::Scaled(raw as f64 / scale.denominator()),
        }
    }

    fn unscale_unsigned(&self, value: &RegisterValue) -> Result<u64, ValueError> {
        match (self.scale, value) {
            (Scale::Unit, RegisterValue::Unsigned(x)) => Ok(*x),
            (scale, RegisterValue::Scaled(x)) if scale != Scale::Unit => {
                let raw = (x * scale.denominator()).round();
                if raw < 0.0 || raw > u64::MAX as f64 {
                    return Err(ValueError::OutOfRange);
                }
                Ok(raw as u64)
            }
            _ => Err(ValueError::KindMismatch),
        }
    }

    fn unscale_signed(&self, value: &RegisterValue) -> Result<i64, ValueError> {
        match (self.scale, value) {
            (Scale::Unit, RegisterValue::Signed(x)) => Ok(*x),
            (scale, RegisterValue::Scaled(x)) if scale != Scale::Unit => {
                let raw = (x * scale.denominator()).round();
                if raw < i64::MIN as f64 || raw > i64::MAX as f64 {
                    return Err(ValueError::OutOfRange);
                }
                Ok(raw as i64)
            }
            _ => Err(ValueError::KindMismatch),
        }
    }
}

/// An immutable table of register definitions with name and range lookup
#[derive(Copy, Clone, Debug)]
pub struct RegisterSchema {
    defs: &'static [RegisterDefinition],
}

impl RegisterSchema {
    /// Wrap a static table of definitions
    pub const fn new(defs: &'static [RegisterDefinition]) -> Self {
        Self { defs }
    }

    /// All definitions in the schema
    pub fn definitions(&self) -> &'static [RegisterDefinition] {
        self.defs
    }

    /// Look up a definition by its field name
    pub fn find(&self, name: &str) -> Option<&'static RegisterDefinition> {
        self.defs.iter().find(|def| def.name == name)
    }

    /// Definitions in the given space that fall entirely within the range
    pub fn contained_in(
        &self,
        space: RegisterSpace,
        range: AddressRange,
    ) -> impl Iterator<Item = &'static RegisterDefinition> {
        let end = range.start as u32 + range.count as u32;
        self.defs.iter().filter(move |def| {
            def.space == space
                && def.address >= range.start
                && (def.address as u32 + def.width() as u32) <= end
        })
    }
}

/// Snapshot of decoded register values taken from a single read
#[derive(Clone, Debug, PartialEq)]
pub struct InverterState {
    timestamp: SystemTime,
    values: BTreeMap<&'static str, RegisterValue>,
}

impl InverterState {
    pub(crate) fn new(values: BTreeMap<&'static str, RegisterValue>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            values,
        }
    }

    /// When the snapshot was taken
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Look up a decoded value by field name
    pub fn get(&self, name: &str) -> Option<&RegisterValue> {
        self.values.get(name)
    }

    /// Iterate over all decoded fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RegisterValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no schema field was contained in the read range
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
