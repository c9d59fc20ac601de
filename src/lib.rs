//! # CBOR Object Library
//!
//! A CBOR (Concise Binary Object Representation, RFC 8949) object model and
//! decoder that keeps the wire form of every item.
//!
//! ## Features
//! - One [`CborObject`] variant per major type and encoding form, including
//!   indefinite-length byte strings, text strings, arrays and maps
//! - Header widths are preserved: a value decoded from a two byte field is
//!   written back with a two byte field
//! - Half, single and double precision floats (`half` for 16 bit floats)
//! - Tags (major type 6) resolved through an extensible [`TagRegistry`]:
//!   - Date/time strings (tag 0)
//!   - Epoch timestamps (tag 1)
//!   - Positive and negative big integers (tags 2 and 3)
//!   - URIs (tag 32)
//!   - Self-described CBOR (tag 55799)
//!   - Any other number decodes to a generic tag with its child untouched
//! - Normalization of any object to a native [`Value`] tree, optionally
//!   ignoring tag semantics
//! - A streaming [`Encoder`] for producing indefinite-length items piecewise
//! - Bounded nesting depth when decoding untrusted input
//!
//! ## Example
//! ```rust
//! use cbor_object::{CborObject, Value, from_slice, to_vec};
//!
//! let object = CborObject::map(vec![
//!     (CborObject::text("n"), CborObject::integer(-10)),
//!     (CborObject::text("big"), CborObject::tag(2, CborObject::bytes(vec![0x01, 0x00])).unwrap()),
//! ]);
//! let bytes = to_vec(&object);
//!
//! let decoded = from_slice(&bytes).unwrap();
//! assert_eq!(decoded.to_bytes(), bytes);
//!
//! let value = decoded.normalize(false);
//! let map = value.as_map().unwrap();
//! assert_eq!(map[&Value::from("n")], Value::Integer(-10));
//! assert_eq!(map[&Value::from("big")], Value::Integer(256));
//! ```

use std::io::{self, Read};

pub mod container;
pub mod decoder;
pub mod encoder;
pub mod length;
pub mod object;
pub mod other;
pub mod reader;
pub mod tags;
pub mod value;

pub use container::{
    Array, ArrayBuilder, IndefiniteArray, IndefiniteMap, Map, MapBuilder, MapEntry,
};
pub use decoder::{DEFAULT_MAX_DEPTH, Decoder, Items};
pub use encoder::Encoder;
pub use length::{Length, decode_length, encode_length, encode_length_big};
pub use object::{ByteString, CborObject, IndefiniteByteString, IndefiniteTextString, TextString};
pub use other::{Other, SimpleValue};
pub use reader::{ByteReader, IoReader, SliceReader};
pub use tags::{Tag, TagHandler, TagRegistry};
pub use value::Value;

// CBOR major types
pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

/// Additional information value for indefinite-length items.
pub const INDEFINITE: u8 = 31;
/// Terminates an indefinite-length item: major type 7, additional
/// information 31.
pub const BREAK: u8 = 0xFF;

#[derive(Debug, thiserror::Error)]
pub enum CborError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Input ended in the middle of an item")]
    TruncatedInput,

    #[error("Invalid UTF-8")]
    InvalidUtf8,

    #[error("Invalid payload for tag {tag}: {reason}")]
    InvalidTagPayload { tag: u64, reason: String },

    #[error("Invalid construction: {0}")]
    ConstructionError(String),

    #[error("Length or tag number does not fit in 64 bits")]
    UnsupportedLength,

    #[error("Nesting deeper than {0} levels")]
    DepthLimitExceeded(usize),

    #[error("Trailing bytes after the item")]
    TrailingBytes,

    #[error("Item {index} of the sequence failed: {source}")]
    Sequence {
        index: usize,
        #[source]
        source: Box<CborError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CborError>;

pub mod error {
    pub use super::CborError as Error;
}

/// Encodes `object` into a new buffer.
pub fn to_vec(object: &CborObject) -> Vec<u8> {
    object.to_bytes()
}

/// Decodes exactly one item from `data` with the default [`Decoder`].
///
/// Fails with [`CborError::TrailingBytes`] if anything follows the item.
pub fn from_slice(data: &[u8]) -> Result<CborObject> {
    let mut reader = SliceReader::new(data);
    let object = Decoder::new().decode(&mut reader)?;
    if !reader.is_empty() {
        return Err(CborError::TrailingBytes);
    }
    Ok(object)
}

/// Decodes one item from `reader` with the default [`Decoder`], leaving any
/// following bytes unread.
pub fn from_reader<R: Read>(reader: R) -> Result<CborObject> {
    Decoder::new().decode(&mut IoReader::new(reader))
}
