//! The CBOR object model: one variant per major type and encoding form.

use crate::container::{Array, IndefiniteArray, IndefiniteMap, Map, MapEntry};
use crate::length::{Length, encode_length, encode_length_big};
use crate::other::Other;
use crate::tags::Tag;
use crate::value::Value;
use crate::{
    BREAK, CborError, INDEFINITE, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE,
    MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED, Result,
};
use num_bigint::{BigInt, BigUint};

/// A decoded or programmatically built CBOR data item.
///
/// Every variant has a fixed major type. Serialization and normalization are
/// pure functions of the current state; neither mutates the object.
#[derive(Debug, Clone, PartialEq)]
pub enum CborObject {
    /// Major type 0, the argument is the value itself
    UnsignedInteger(Length),
    /// Major type 1, the argument is the magnitude `m` of `-1 - m`
    NegativeInteger(Length),
    ByteString(ByteString),
    IndefiniteByteString(IndefiniteByteString),
    TextString(TextString),
    IndefiniteTextString(IndefiniteTextString),
    Array(Array),
    IndefiniteArray(IndefiniteArray),
    Map(Map),
    IndefiniteMap(IndefiniteMap),
    Tag(Tag),
    Other(Other),
}

impl CborObject {
    pub fn unsigned(n: u64) -> Self {
        CborObject::UnsignedInteger(encode_length(n))
    }

    /// An unsigned integer of any size.
    ///
    /// Values above `u64::MAX` keep their number in memory but serialize as
    /// the bare header `0x1F`, which no decoder accepts back. See
    /// [`encode_length_big`].
    pub fn unsigned_big(n: &BigUint) -> Self {
        CborObject::UnsignedInteger(encode_length_big(n))
    }

    /// The negative integer `-1 - magnitude`.
    pub fn negative(magnitude: u64) -> Self {
        CborObject::NegativeInteger(encode_length(magnitude))
    }

    pub fn integer(n: i64) -> Self {
        if n >= 0 {
            CborObject::unsigned(n as u64)
        } else {
            CborObject::negative((-1 - n) as u64)
        }
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        CborObject::ByteString(ByteString::new(data))
    }

    pub fn text(text: impl Into<String>) -> Self {
        CborObject::TextString(TextString::new(text))
    }

    pub fn array(items: Vec<CborObject>) -> Self {
        CborObject::Array(Array::new(items))
    }

    /// A definite map; a later key that normalizes equal to an earlier one
    /// replaces its entry.
    pub fn map(entries: Vec<(CborObject, CborObject)>) -> Self {
        CborObject::Map(Map::new(entries.into_iter().map(|(k, v)| MapEntry::new(k, v))))
    }

    /// Tag `number` around `child`, see [`Tag::new`].
    ///
    /// Fails if `number` has a built-in handler that rejects `child`.
    pub fn tag(number: u64, child: CborObject) -> Result<Self> {
        Tag::new(number, child).map(CborObject::Tag)
    }

    pub fn bool(b: bool) -> Self {
        CborObject::Other(if b { Other::True } else { Other::False })
    }

    pub fn null() -> Self {
        CborObject::Other(Other::Null)
    }

    pub fn undefined() -> Self {
        CborObject::Other(Other::Undefined)
    }

    /// A float; with the `compact_floats` feature the narrowest lossless width
    /// is used, otherwise always 64 bits.
    pub fn float(f: f64) -> Self {
        CborObject::Other(Other::float(f))
    }

    /// The 3 bit major type.
    pub fn major_type(&self) -> u8 {
        match self {
            CborObject::UnsignedInteger(_) => MAJOR_UNSIGNED,
            CborObject::NegativeInteger(_) => MAJOR_NEGATIVE,
            CborObject::ByteString(_) | CborObject::IndefiniteByteString(_) => MAJOR_BYTES,
            CborObject::TextString(_) | CborObject::IndefiniteTextString(_) => MAJOR_TEXT,
            CborObject::Array(_) | CborObject::IndefiniteArray(_) => MAJOR_ARRAY,
            CborObject::Map(_) | CborObject::IndefiniteMap(_) => MAJOR_MAP,
            CborObject::Tag(_) => MAJOR_TAG,
            CborObject::Other(_) => MAJOR_SIMPLE,
        }
    }

    /// The 5 bit additional information of the initial byte.
    pub fn additional_information(&self) -> u8 {
        match self {
            CborObject::UnsignedInteger(length) | CborObject::NegativeInteger(length) => {
                length.additional_information()
            }
            CborObject::ByteString(b) => b.header().additional_information(),
            CborObject::TextString(t) => t.header().additional_information(),
            CborObject::Array(a) => a.header().additional_information(),
            CborObject::Map(m) => m.header().additional_information(),
            CborObject::IndefiniteByteString(_)
            | CborObject::IndefiniteTextString(_)
            | CborObject::IndefiniteArray(_)
            | CborObject::IndefiniteMap(_) => INDEFINITE,
            CborObject::Tag(t) => t.header().additional_information(),
            CborObject::Other(o) => o.additional_information(),
        }
    }

    /// True for the streaming forms terminated by a break marker.
    pub fn is_indefinite(&self) -> bool {
        matches!(
            self,
            CborObject::IndefiniteByteString(_)
                | CborObject::IndefiniteTextString(_)
                | CborObject::IndefiniteArray(_)
                | CborObject::IndefiniteMap(_)
        )
    }

    /// Appends the encoded item to `out`.
    pub fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            CborObject::UnsignedInteger(length) => length.write_header(MAJOR_UNSIGNED, out),
            CborObject::NegativeInteger(length) => length.write_header(MAJOR_NEGATIVE, out),
            CborObject::ByteString(b) => b.encode_to(out),
            CborObject::IndefiniteByteString(b) => {
                out.push((MAJOR_BYTES << 5) | INDEFINITE);
                for chunk in b.chunks() {
                    chunk.encode_to(out);
                }
                out.push(BREAK);
            }
            CborObject::TextString(t) => t.encode_to(out),
            CborObject::IndefiniteTextString(t) => {
                out.push((MAJOR_TEXT << 5) | INDEFINITE);
                for chunk in t.chunks() {
                    chunk.encode_to(out);
                }
                out.push(BREAK);
            }
            CborObject::Array(a) => {
                a.header().write_header(MAJOR_ARRAY, out);
                for item in a.iter() {
                    item.encode_to(out);
                }
            }
            CborObject::IndefiniteArray(a) => {
                out.push((MAJOR_ARRAY << 5) | INDEFINITE);
                for item in a.iter() {
                    item.encode_to(out);
                }
                out.push(BREAK);
            }
            CborObject::Map(m) => {
                m.header().write_header(MAJOR_MAP, out);
                for entry in m.iter() {
                    entry.key().encode_to(out);
                    entry.value().encode_to(out);
                }
            }
            CborObject::IndefiniteMap(m) => {
                out.push((MAJOR_MAP << 5) | INDEFINITE);
                for entry in m.iter() {
                    entry.key().encode_to(out);
                    entry.value().encode_to(out);
                }
                out.push(BREAK);
            }
            CborObject::Tag(t) => {
                t.header().write_header(MAJOR_TAG, out);
                t.child().encode_to(out);
            }
            CborObject::Other(o) => o.encode_to(out),
        }
    }

    /// The encoded item.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }

    /// Projects the item to a native [`Value`].
    ///
    /// With `ignore_tags` every tag passes its child's normalization through
    /// unchanged instead of applying its own interpretation.
    pub fn normalize(&self, ignore_tags: bool) -> Value {
        match self {
            CborObject::UnsignedInteger(length) => match length.value() {
                Some(n) => Value::Integer(n as i128),
                None => Value::from_biguint(length.to_biguint().unwrap_or_default()),
            },
            CborObject::NegativeInteger(length) => match length.value() {
                Some(n) => Value::Integer(-1 - n as i128),
                None => Value::from_bigint(
                    -BigInt::from(length.to_biguint().unwrap_or_default()) - 1,
                ),
            },
            CborObject::ByteString(b) => Value::Bytes(b.as_slice().to_vec()),
            CborObject::IndefiniteByteString(b) => Value::Bytes(b.content()),
            CborObject::TextString(t) => Value::Text(t.as_str().to_owned()),
            CborObject::IndefiniteTextString(t) => Value::Text(t.content()),
            CborObject::Array(a) => {
                Value::Array(a.iter().map(|item| item.normalize(ignore_tags)).collect())
            }
            CborObject::IndefiniteArray(a) => {
                Value::Array(a.iter().map(|item| item.normalize(ignore_tags)).collect())
            }
            CborObject::Map(m) => Value::Map(
                m.iter()
                    .map(|e| (e.key().normalize(ignore_tags), e.value().normalize(ignore_tags)))
                    .collect(),
            ),
            CborObject::IndefiniteMap(m) => Value::Map(
                m.iter()
                    .map(|e| (e.key().normalize(ignore_tags), e.value().normalize(ignore_tags)))
                    .collect(),
            ),
            CborObject::Tag(t) => t.normalize(ignore_tags),
            CborObject::Other(o) => o.normalize(),
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            CborObject::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_other(&self) -> Option<&Other> {
        match self {
            CborObject::Other(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Tag> for CborObject {
    fn from(tag: Tag) -> Self {
        CborObject::Tag(tag)
    }
}

impl From<Other> for CborObject {
    fn from(other: Other) -> Self {
        CborObject::Other(other)
    }
}

/// Definite-length byte string. The length header is derived from the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteString {
    data: Vec<u8>,
}

impl ByteString {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        ByteString { data: data.into() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn header(&self) -> Length {
        encode_length(self.data.len() as u64)
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.header().write_header(MAJOR_BYTES, out);
        out.extend_from_slice(&self.data);
    }
}

/// Definite-length text string, always valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextString {
    text: String,
}

impl TextString {
    pub fn new(text: impl Into<String>) -> Self {
        TextString { text: text.into() }
    }

    /// Validates raw content read from the wire.
    pub fn from_utf8(data: Vec<u8>) -> Result<Self> {
        String::from_utf8(data)
            .map(|text| TextString { text })
            .map_err(|_| CborError::InvalidUtf8)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn header(&self) -> Length {
        encode_length(self.text.len() as u64)
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.header().write_header(MAJOR_TEXT, out);
        out.extend_from_slice(self.text.as_bytes());
    }
}

/// Byte string sent as a sequence of definite chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndefiniteByteString {
    chunks: Vec<ByteString>,
}

impl IndefiniteByteString {
    pub fn new(chunks: Vec<ByteString>) -> Self {
        IndefiniteByteString { chunks }
    }

    pub fn chunks(&self) -> &[ByteString] {
        &self.chunks
    }

    /// The chunks joined together.
    pub fn content(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.as_slice()).copied().collect()
    }
}

/// Text string sent as a sequence of definite chunks, each valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndefiniteTextString {
    chunks: Vec<TextString>,
}

impl IndefiniteTextString {
    pub fn new(chunks: Vec<TextString>) -> Self {
        IndefiniteTextString { chunks }
    }

    pub fn chunks(&self) -> &[TextString] {
        &self.chunks
    }

    pub fn content(&self) -> String {
        self.chunks.iter().map(TextString::as_str).collect()
    }
}
