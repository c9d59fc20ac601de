use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Native value produced by normalizing a [`CborObject`](crate::CborObject)
///
/// Normalization drops wire-level details (header widths, definite versus
/// indefinite containers, chunking) and keeps only what an application sees.
///
/// # Example
/// ```
/// use cbor_object::{CborObject, Value};
///
/// let object = CborObject::array(vec![
///     CborObject::unsigned(1),
///     CborObject::text("two"),
/// ]);
/// assert_eq!(
///     object.normalize(false),
///     Value::Array(vec![Value::Integer(1), Value::Text("two".to_string())])
/// );
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Undefined value
    Undefined,
    /// Boolean value
    Bool(bool),
    /// Integer value, covers the whole CBOR integer range
    Integer(i128),
    /// Integer outside the `i128` range, only produced by big integer tags
    BigInteger(BigInt),
    /// Floating point value, widened to 64 bits
    Float(f64),
    /// Byte string
    Bytes(Vec<u8>),
    /// Text string
    Text(String),
    /// Array of values
    Array(Vec<Value>),
    /// Map of values
    Map(BTreeMap<Value, Value>),
    /// Unassigned simple value
    Simple(u8),
}

impl Value {
    /// Builds the canonical integer value: `Integer` when it fits, otherwise
    /// `BigInteger`.
    pub fn from_bigint(n: BigInt) -> Value {
        match n.to_i128() {
            Some(i) => Value::Integer(i),
            None => Value::BigInteger(n),
        }
    }

    pub fn from_biguint(n: BigUint) -> Value {
        Value::from_bigint(BigInt::from(n))
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if the value is a boolean
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns true if the value is an integer of any size
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::BigInteger(_))
    }

    /// Returns true if the value is a float
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Returns true if the value is bytes
    pub fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    /// Returns true if the value is text
    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// Returns true if the value is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true if the value is a map
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns the value as a boolean, if it is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an integer in range
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Returns the value as an i128, if it is an integer in range
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns any integer at full precision
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Integer(i) => Some(BigInt::from(*i)),
            Value::BigInteger(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Returns the value as a float, if it is one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as bytes, if it is a byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as text, if it is a text string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an array, if it is one
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the value as a map, if it is one
    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Undefined => 1,
            Value::Bool(_) => 2,
            Value::Integer(_) | Value::BigInteger(_) => 3,
            Value::Float(_) => 4,
            Value::Bytes(_) => 5,
            Value::Text(_) => 6,
            Value::Array(_) => 7,
            Value::Map(_) => 8,
            Value::Simple(_) => 9,
        }
    }
}

// Total order so values can key a map. Floats compare with `total_cmp`, which
// keeps NaN equal to itself and tells 0.0 and -0.0 apart.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(_) | Value::BigInteger(_), Value::Integer(_) | Value::BigInteger(_)) => {
                self.as_bigint().cmp(&other.as_bigint())
            }
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.iter().cmp(b.iter()),
            (Value::Simple(a), Value::Simple(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i as i128)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Integer(i as i128)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => {
                if let Ok(i) = i64::try_from(*i) {
                    serializer.serialize_i64(i)
                } else if let Ok(u) = u64::try_from(*i) {
                    serializer.serialize_u64(u)
                } else {
                    serializer.serialize_i128(*i)
                }
            }
            // Formats have no portable big integer type
            Value::BigInteger(n) => serializer.collect_str(n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(a) => a.serialize(serializer),
            Value::Map(m) => m.serialize(serializer),
            Value::Simple(v) => serializer.serialize_u8(*v),
        }
    }
}
