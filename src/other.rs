//! Major type 7: simple values and floats.
//!
//! The break marker (`0xFF`) shares this major type but is not a value; it
//! only appears as the terminator the encoder and decoder handle for
//! indefinite-length items.

use crate::value::Value;
use crate::{CborError, MAJOR_SIMPLE, Result};
use half::f16;

// Additional information values
pub const FALSE: u8 = 20;
pub const TRUE: u8 = 21;
pub const NULL: u8 = 22;
pub const UNDEFINED: u8 = 23;
pub const SIMPLE_VALUE: u8 = 24;
pub const HALF_FLOAT: u8 = 25;
pub const SINGLE_FLOAT: u8 = 26;
pub const DOUBLE_FLOAT: u8 = 27;

/// An unassigned simple value: 0 to 19 inline, or 32 to 255 in a following
/// byte. 20 to 31 are never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleValue(u8);

impl SimpleValue {
    pub fn new(value: u8) -> Result<Self> {
        match value {
            0..=19 | 32..=255 => Ok(SimpleValue(value)),
            _ => Err(CborError::ConstructionError(format!(
                "{value} is not an unassigned simple value"
            ))),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// The closed set of major type 7 items.
#[derive(Debug, Clone, Copy)]
pub enum Other {
    False,
    True,
    Null,
    Undefined,
    Simple(SimpleValue),
    HalfFloat(f16),
    SingleFloat(f32),
    DoubleFloat(f64),
}

impl Other {
    /// Builds a simple value by number. 20 to 23 map to the named values,
    /// 24 to 31 are reserved and rejected.
    pub fn simple(value: u8) -> Result<Self> {
        Ok(match value {
            FALSE => Other::False,
            TRUE => Other::True,
            NULL => Other::Null,
            UNDEFINED => Other::Undefined,
            _ => Other::Simple(SimpleValue::new(value)?),
        })
    }

    #[cfg(not(feature = "compact_floats"))]
    pub fn float(f: f64) -> Self {
        Other::DoubleFloat(f)
    }

    #[cfg(feature = "compact_floats")]
    pub fn float(f: f64) -> Self {
        if f.is_nan() {
            return Other::HalfFloat(f16::NAN);
        }
        let half = f16::from_f64(f);
        if half.to_f64() == f {
            return Other::HalfFloat(half);
        }
        let single = f as f32;
        if single as f64 == f {
            return Other::SingleFloat(single);
        }
        Other::DoubleFloat(f)
    }

    pub fn additional_information(&self) -> u8 {
        match self {
            Other::False => FALSE,
            Other::True => TRUE,
            Other::Null => NULL,
            Other::Undefined => UNDEFINED,
            Other::Simple(v) if v.0 < 24 => v.0,
            Other::Simple(_) => SIMPLE_VALUE,
            Other::HalfFloat(_) => HALF_FLOAT,
            Other::SingleFloat(_) => SINGLE_FLOAT,
            Other::DoubleFloat(_) => DOUBLE_FLOAT,
        }
    }

    /// The value widened to 64 bits, for the three float widths.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Other::HalfFloat(f) => Some(f.to_f64()),
            Other::SingleFloat(f) => Some(*f as f64),
            Other::DoubleFloat(f) => Some(*f),
            _ => None,
        }
    }

    pub(crate) fn encode_to(&self, out: &mut Vec<u8>) {
        out.push((MAJOR_SIMPLE << 5) | self.additional_information());
        match self {
            Other::Simple(v) if v.0 >= 32 => out.push(v.0),
            Other::HalfFloat(f) => out.extend_from_slice(&f.to_be_bytes()),
            Other::SingleFloat(f) => out.extend_from_slice(&f.to_be_bytes()),
            Other::DoubleFloat(f) => out.extend_from_slice(&f.to_be_bytes()),
            _ => {}
        }
    }

    pub(crate) fn normalize(&self) -> Value {
        match self {
            Other::False => Value::Bool(false),
            Other::True => Value::Bool(true),
            Other::Null => Value::Null,
            Other::Undefined => Value::Undefined,
            Other::Simple(v) => Value::Simple(v.0),
            Other::HalfFloat(_) | Other::SingleFloat(_) | Other::DoubleFloat(_) => {
                Value::Float(self.as_f64().unwrap_or(f64::NAN))
            }
        }
    }
}

// Floats compare by bit pattern so NaN payloads and signed zeros survive
// equality checks.
impl PartialEq for Other {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Other::Simple(a), Other::Simple(b)) => a == b,
            (Other::HalfFloat(a), Other::HalfFloat(b)) => a.to_bits() == b.to_bits(),
            (Other::SingleFloat(a), Other::SingleFloat(b)) => a.to_bits() == b.to_bits(),
            (Other::DoubleFloat(a), Other::DoubleFloat(b)) => a.to_bits() == b.to_bits(),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for Other {}
