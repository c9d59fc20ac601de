//! Decoding bytes into [`CborObject`] trees.

use crate::container::{Array, ArrayBuilder, MapBuilder};
use crate::length::{Length, decode_length};
use crate::object::{
    ByteString, CborObject, IndefiniteByteString, IndefiniteTextString, TextString,
};
use crate::other::{DOUBLE_FLOAT, HALF_FLOAT, Other, SIMPLE_VALUE, SINGLE_FLOAT, SimpleValue};
use crate::reader::ByteReader;
use crate::tags::TagRegistry;
use crate::{
    BREAK, CborError, INDEFINITE, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED, Result,
};
use half::f16;
use tracing::{debug, trace};

/// Containers and tags nested deeper than this fail with
/// [`CborError::DepthLimitExceeded`] unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

// A definite header may claim far more items than the input holds, so the
// up-front reservation is capped and the vector grows as items arrive.
const MAX_PREALLOCATE: usize = 1024;

/// Reads CBOR items using a tag registry and a nesting limit.
///
/// A `Decoder` holds no per-call state; one instance can decode from many
/// readers, including from several threads at once.
///
/// # Example
/// ```
/// use cbor_object::{Decoder, SliceReader, Value};
///
/// let mut reader = SliceReader::new(&[0xc2, 0x42, 0x01, 0x00]);
/// let object = Decoder::new().decode(&mut reader).unwrap();
/// assert_eq!(object.normalize(false), Value::Integer(256));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: TagRegistry,
    max_depth: usize,
}

impl Decoder {
    /// Built-in tag handlers and [`DEFAULT_MAX_DEPTH`].
    pub fn new() -> Self {
        Decoder {
            registry: TagRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_registry(mut self, registry: TagRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets how many containers or tags may enclose an item.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decodes one complete item. The reader is left just past it.
    ///
    /// On error nothing is returned and the reader position is unspecified.
    pub fn decode<R>(&self, reader: &mut R) -> Result<CborObject>
    where
        R: ByteReader + ?Sized,
    {
        self.decode_nested(reader, 0)
    }

    /// Decodes every top-level item until the reader is exhausted.
    ///
    /// The first failure is returned as [`CborError::Sequence`] with the
    /// index of the item that failed.
    pub fn decode_all<R: ByteReader>(&self, reader: R) -> Result<Vec<CborObject>> {
        self.items(reader).collect()
    }

    /// Iterates over top-level items, stopping after the first error.
    pub fn items<R: ByteReader>(&self, reader: R) -> Items<'_, R> {
        Items {
            decoder: self,
            reader,
            index: 0,
            failed: false,
        }
    }

    // An item where a break marker is not allowed.
    fn decode_nested<R>(&self, reader: &mut R, depth: usize) -> Result<CborObject>
    where
        R: ByteReader + ?Sized,
    {
        self.decode_item(reader, depth)?.ok_or_else(|| {
            CborError::MalformedHeader("unexpected break marker".to_string())
        })
    }

    // `None` means a break marker was read in place of an item.
    fn decode_item<R>(&self, reader: &mut R, depth: usize) -> Result<Option<CborObject>>
    where
        R: ByteReader + ?Sized,
    {
        if depth > self.max_depth {
            return Err(CborError::DepthLimitExceeded(self.max_depth));
        }

        let initial = reader.read_u8()?;
        if initial == BREAK {
            return Ok(None);
        }
        let major = initial >> 5;
        let ai = initial & 0x1F;

        let object = match major {
            MAJOR_UNSIGNED => CborObject::UnsignedInteger(self.read_argument(major, ai, reader)?),
            MAJOR_NEGATIVE => CborObject::NegativeInteger(self.read_argument(major, ai, reader)?),
            MAJOR_BYTES if ai == INDEFINITE => {
                trace!(depth, "decoding indefinite-length byte string");
                let mut chunks = Vec::new();
                while let Some(data) = self.read_chunk(MAJOR_BYTES, reader)? {
                    chunks.push(ByteString::new(data));
                }
                CborObject::IndefiniteByteString(IndefiniteByteString::new(chunks))
            }
            MAJOR_BYTES => {
                let length = decode_length(ai, reader)?;
                CborObject::ByteString(ByteString::new(read_payload(&length, reader)?))
            }
            MAJOR_TEXT if ai == INDEFINITE => {
                trace!(depth, "decoding indefinite-length text string");
                let mut chunks = Vec::new();
                while let Some(data) = self.read_chunk(MAJOR_TEXT, reader)? {
                    chunks.push(TextString::from_utf8(data)?);
                }
                CborObject::IndefiniteTextString(IndefiniteTextString::new(chunks))
            }
            MAJOR_TEXT => {
                let length = decode_length(ai, reader)?;
                CborObject::TextString(TextString::from_utf8(read_payload(&length, reader)?)?)
            }
            MAJOR_ARRAY if ai == INDEFINITE => {
                trace!(depth, "decoding indefinite-length array");
                let mut builder = ArrayBuilder::indefinite();
                while let Some(item) = self.decode_item(reader, depth + 1)? {
                    builder.push(item);
                }
                builder.finish()?
            }
            MAJOR_ARRAY => {
                let count = to_usize(&decode_length(ai, reader)?)?;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATE));
                for _ in 0..count {
                    items.push(self.decode_nested(reader, depth + 1)?);
                }
                CborObject::Array(Array::new(items))
            }
            MAJOR_MAP if ai == INDEFINITE => {
                trace!(depth, "decoding indefinite-length map");
                let mut builder = MapBuilder::indefinite();
                while let Some(key) = self.decode_item(reader, depth + 1)? {
                    let value = self.decode_item(reader, depth + 1)?.ok_or_else(|| {
                        CborError::MalformedHeader(
                            "break marker between a map key and its value".to_string(),
                        )
                    })?;
                    builder.insert(key, value);
                }
                builder.finish()?
            }
            MAJOR_MAP => {
                let count = to_usize(&decode_length(ai, reader)?)?;
                // Duplicate keys collapse, so the declared count is not enforced
                let mut builder = MapBuilder::definite();
                for _ in 0..count {
                    let key = self.decode_nested(reader, depth + 1)?;
                    let value = self.decode_nested(reader, depth + 1)?;
                    builder.insert(key, value);
                }
                builder.finish()?
            }
            MAJOR_TAG => {
                let header = self.read_argument(major, ai, reader)?;
                let child = self.decode_nested(reader, depth + 1)?;
                CborObject::Tag(self.registry.create(header, child)?)
            }
            // MAJOR_SIMPLE, the only value left for three bits
            _ => CborObject::Other(read_other(ai, reader)?),
        };
        Ok(Some(object))
    }

    // Integer values and tag numbers: a length field that cannot be indefinite.
    fn read_argument<R>(&self, major: u8, ai: u8, reader: &mut R) -> Result<Length>
    where
        R: ByteReader + ?Sized,
    {
        if ai == INDEFINITE {
            return Err(CborError::MalformedHeader(format!(
                "additional information 31 is not valid for major type {major}"
            )));
        }
        decode_length(ai, reader)
    }

    // One definite chunk of an indefinite string, `None` at the break marker.
    fn read_chunk<R>(&self, major: u8, reader: &mut R) -> Result<Option<Vec<u8>>>
    where
        R: ByteReader + ?Sized,
    {
        let initial = reader.read_u8()?;
        if initial == BREAK {
            return Ok(None);
        }
        let chunk_major = initial >> 5;
        let ai = initial & 0x1F;
        if chunk_major != major {
            return Err(CborError::MalformedHeader(format!(
                "major type {chunk_major} chunk inside an indefinite major type {major} string"
            )));
        }
        if ai == INDEFINITE {
            return Err(CborError::MalformedHeader(
                "nested indefinite-length string chunk".to_string(),
            ));
        }
        let length = decode_length(ai, reader)?;
        read_payload(&length, reader).map(Some)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

fn to_usize(length: &Length) -> Result<usize> {
    usize::try_from(length.try_value()?).map_err(|_| CborError::UnsupportedLength)
}

fn read_payload<R>(length: &Length, reader: &mut R) -> Result<Vec<u8>>
where
    R: ByteReader + ?Sized,
{
    let n = to_usize(length)?;
    reader.read_exactly(n)
}

fn read_other<R>(ai: u8, reader: &mut R) -> Result<Other>
where
    R: ByteReader + ?Sized,
{
    Ok(match ai {
        0..=23 => Other::simple(ai)?,
        SIMPLE_VALUE => {
            let value = reader.read_u8()?;
            if value < 32 {
                return Err(CborError::MalformedHeader(format!(
                    "simple value {value} must use the one byte form"
                )));
            }
            Other::Simple(SimpleValue::new(value)?)
        }
        HALF_FLOAT => Other::HalfFloat(f16::from_bits(reader.read_u16()?)),
        SINGLE_FLOAT => Other::SingleFloat(f32::from_bits(reader.read_u32()?)),
        DOUBLE_FLOAT => Other::DoubleFloat(f64::from_bits(reader.read_u64()?)),
        // 28 to 30. 31 is the break marker, consumed by the caller before
        // dispatching here.
        _ => {
            return Err(CborError::MalformedHeader(format!(
                "reserved additional information {ai}"
            )));
        }
    })
}

/// Iterator over the top-level items of a CBOR sequence.
///
/// Yields each item in turn; after an error it yields that error once,
/// wrapped in [`CborError::Sequence`], and then ends.
#[derive(Debug)]
pub struct Items<'a, R> {
    decoder: &'a Decoder,
    reader: R,
    index: usize,
    failed: bool,
}

impl<R: ByteReader> Items<'_, R> {
    /// Returns the underlying reader.
    pub fn into_reader(self) -> R {
        self.reader
    }

    fn next_item(&mut self) -> Result<Option<CborObject>> {
        if self.reader.peek_byte()?.is_none() {
            return Ok(None);
        }
        self.decoder.decode(&mut self.reader).map(Some)
    }
}

impl<R: ByteReader> Iterator for Items<'_, R> {
    type Item = Result<CborObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_item() {
            Ok(Some(object)) => {
                self.index += 1;
                Some(Ok(object))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                debug!(index = self.index, error = %e, "stopping sequence decode");
                Some(Err(CborError::Sequence {
                    index: self.index,
                    source: Box::new(e),
                }))
            }
        }
    }
}
