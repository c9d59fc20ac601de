//! Tags (major type 6) and the registry that gives tag numbers meaning.
//!
//! A tag wraps exactly one child. What the child is allowed to be, and what
//! the pair normalizes to, is decided by a [`TagHandler`] looked up by tag
//! number in a [`TagRegistry`]. Numbers nobody registered get [`GenericTag`],
//! which keeps the child untouched.

use crate::length::{Length, encode_length};
use crate::object::{ByteString, CborObject};
use crate::value::Value;
use crate::{CborError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

// Tag numbers with a built-in handler
pub const TAG_DATETIME_STRING: u64 = 0; // RFC 3339 date/time text
pub const TAG_EPOCH_DATETIME: u64 = 1; // Seconds since the epoch
pub const TAG_POSITIVE_BIGNUM: u64 = 2;
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
pub const TAG_URI: u64 = 32; // RFC 3986
pub const TAG_SELF_DESCRIBED: u64 = 55799; // Magic prefix 0xd9d9f7

// Backs the registry-less constructors so they agree with `Decoder::new()`.
static BUILTIN_TAGS: LazyLock<TagRegistry> = LazyLock::new(TagRegistry::new);

/// Interpretation of one tag number.
///
/// Handlers are shared between threads through the registry, so they must
/// not rely on interior mutability to validate or normalize.
pub trait TagHandler: fmt::Debug + Send + Sync {
    /// Short name used in debug output.
    fn name(&self) -> &'static str;

    /// Checks that `child` is an acceptable payload for tag `number`.
    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        let _ = (number, child);
        Ok(())
    }

    /// Projects the tagged child to a native value.
    fn normalize(&self, child: &CborObject) -> Value {
        child.normalize(false)
    }
}

fn invalid_payload(tag: u64, reason: &str) -> CborError {
    CborError::InvalidTagPayload {
        tag,
        reason: reason.to_string(),
    }
}

// Bytes of a definite or chunked byte string
fn byte_content(child: &CborObject) -> Option<Vec<u8>> {
    match child {
        CborObject::ByteString(b) => Some(b.as_slice().to_vec()),
        CborObject::IndefiniteByteString(b) => Some(b.content()),
        _ => None,
    }
}

fn is_text(child: &CborObject) -> bool {
    matches!(
        child,
        CborObject::TextString(_) | CborObject::IndefiniteTextString(_)
    )
}

/// Pass-through handler for unregistered numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTag;

impl TagHandler for GenericTag {
    fn name(&self) -> &'static str {
        "generic"
    }
}

/// Tag 2: a byte string read as a big-endian unsigned magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveBigInteger;

impl TagHandler for PositiveBigInteger {
    fn name(&self) -> &'static str {
        "positive big integer"
    }

    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        match byte_content(child) {
            Some(_) => Ok(()),
            None => Err(invalid_payload(number, "expected a byte string")),
        }
    }

    fn normalize(&self, child: &CborObject) -> Value {
        match byte_content(child) {
            Some(bytes) => Value::from_biguint(BigUint::from_bytes_be(&bytes)),
            None => child.normalize(false),
        }
    }
}

/// Tag 3: a byte string holding `n`, standing for `-1 - n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeBigInteger;

impl TagHandler for NegativeBigInteger {
    fn name(&self) -> &'static str {
        "negative big integer"
    }

    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        match byte_content(child) {
            Some(_) => Ok(()),
            None => Err(invalid_payload(number, "expected a byte string")),
        }
    }

    fn normalize(&self, child: &CborObject) -> Value {
        match byte_content(child) {
            Some(bytes) => Value::from_bigint(-BigInt::from(BigUint::from_bytes_be(&bytes)) - 1),
            None => child.normalize(false),
        }
    }
}

/// Tag 0: date/time as RFC 3339 text. The text itself is not parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeString;

impl TagHandler for DateTimeString {
    fn name(&self) -> &'static str {
        "date/time string"
    }

    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        if is_text(child) {
            Ok(())
        } else {
            Err(invalid_payload(number, "expected a text string"))
        }
    }
}

/// Tag 1: seconds since 1970-01-01T00:00Z, integer or float.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochDateTime;

impl TagHandler for EpochDateTime {
    fn name(&self) -> &'static str {
        "epoch date/time"
    }

    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        match child {
            CborObject::UnsignedInteger(_) | CborObject::NegativeInteger(_) => Ok(()),
            CborObject::Other(other) if other.as_f64().is_some() => Ok(()),
            _ => Err(invalid_payload(number, "expected an integer or a float")),
        }
    }
}

/// Tag 32: a URI as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uri;

impl TagHandler for Uri {
    fn name(&self) -> &'static str {
        "uri"
    }

    fn validate(&self, number: u64, child: &CborObject) -> Result<()> {
        if is_text(child) {
            Ok(())
        } else {
            Err(invalid_payload(number, "expected a text string"))
        }
    }
}

/// Tag 55799: marks the data as CBOR, transparent otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfDescribed;

impl TagHandler for SelfDescribed {
    fn name(&self) -> &'static str {
        "self-described cbor"
    }
}

/// A tag number, the header it was written with, its child and the handler
/// that validated it.
#[derive(Debug, Clone)]
pub struct Tag {
    number: u64,
    header: Length,
    child: Box<CborObject>,
    handler: Arc<dyn TagHandler>,
}

impl Tag {
    /// Tag `number` with the shortest header, interpreted the way the
    /// default decoder would interpret it.
    ///
    /// Built-in numbers validate `child`, so `Tag::new(2, text)` fails with
    /// [`CborError::InvalidTagPayload`]. Any other number gets [`GenericTag`].
    pub fn new(number: u64, child: CborObject) -> Result<Self> {
        BUILTIN_TAGS.create(encode_length(number), child)
    }

    /// Builds a tag from a decoded or explicit header, validating `child`
    /// against `handler`.
    ///
    /// The header must carry a concrete number; an indefinite header fails
    /// with [`CborError::UnsupportedLength`].
    pub fn with_handler(
        header: Length,
        child: CborObject,
        handler: Arc<dyn TagHandler>,
    ) -> Result<Self> {
        let number = header.try_value()?;
        handler.validate(number, &child)?;
        Ok(Tag {
            number,
            header,
            child: Box::new(child),
            handler,
        })
    }

    /// Tag 2 around `child`, which must be a byte string.
    pub fn positive_big_integer(child: CborObject) -> Result<Self> {
        Tag::with_handler(
            encode_length(TAG_POSITIVE_BIGNUM),
            child,
            Arc::new(PositiveBigInteger),
        )
    }

    /// Tag 3 around `child`, which must be a byte string.
    pub fn negative_big_integer(child: CborObject) -> Result<Self> {
        Tag::with_handler(
            encode_length(TAG_NEGATIVE_BIGNUM),
            child,
            Arc::new(NegativeBigInteger),
        )
    }

    /// Tag 2 or 3 carrying `n` with no leading zero bytes.
    pub fn big_integer(n: &BigInt) -> Self {
        let (number, magnitude) = match n.sign() {
            Sign::Minus => (TAG_NEGATIVE_BIGNUM, (-n - 1u32).magnitude().clone()),
            _ => (TAG_POSITIVE_BIGNUM, n.magnitude().clone()),
        };
        let handler: Arc<dyn TagHandler> = if number == TAG_NEGATIVE_BIGNUM {
            Arc::new(NegativeBigInteger)
        } else {
            Arc::new(PositiveBigInteger)
        };
        // Zero has an empty magnitude
        let bytes = if magnitude == BigUint::default() {
            Vec::new()
        } else {
            magnitude.to_bytes_be()
        };
        Tag {
            number,
            header: encode_length(number),
            child: Box::new(CborObject::ByteString(ByteString::new(bytes))),
            handler,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn header(&self) -> &Length {
        &self.header
    }

    pub fn child(&self) -> &CborObject {
        &self.child
    }

    pub fn into_child(self) -> CborObject {
        *self.child
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    /// With `ignore_tags` the child's own normalization is returned.
    pub fn normalize(&self, ignore_tags: bool) -> Value {
        if ignore_tags {
            self.child.normalize(true)
        } else {
            self.handler.normalize(&self.child)
        }
    }
}

// Equality is over the wire form; the handler only affects normalization.
impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.header == other.header && self.child == other.child
    }
}

/// Tag number to handler mapping used by the decoder.
///
/// Registration takes `&mut self` and lookups `&self`, so a registry filled
/// up front can be shared by any number of concurrent decoders.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    handlers: HashMap<u64, Arc<dyn TagHandler>>,
    fallback: Arc<dyn TagHandler>,
}

impl TagRegistry {
    /// A registry with the built-in handlers for tags 0, 1, 2, 3, 32 and
    /// 55799.
    pub fn new() -> Self {
        let mut registry = TagRegistry::empty();
        registry.register(TAG_DATETIME_STRING, DateTimeString);
        registry.register(TAG_EPOCH_DATETIME, EpochDateTime);
        registry.register(TAG_POSITIVE_BIGNUM, PositiveBigInteger);
        registry.register(TAG_NEGATIVE_BIGNUM, NegativeBigInteger);
        registry.register(TAG_URI, Uri);
        registry.register(TAG_SELF_DESCRIBED, SelfDescribed);
        registry
    }

    /// A registry where every number resolves to [`GenericTag`].
    pub fn empty() -> Self {
        TagRegistry {
            handlers: HashMap::new(),
            fallback: Arc::new(GenericTag),
        }
    }

    /// Installs `handler` for `number`, returning the handler it replaced.
    pub fn register<H>(&mut self, number: u64, handler: H) -> Option<Arc<dyn TagHandler>>
    where
        H: TagHandler + 'static,
    {
        let handler: Arc<dyn TagHandler> = Arc::new(handler);
        debug!(tag = number, handler = handler.name(), "registering tag handler");
        self.handlers.insert(number, handler)
    }

    pub fn unregister(&mut self, number: u64) -> Option<Arc<dyn TagHandler>> {
        self.handlers.remove(&number)
    }

    pub fn contains(&self, number: u64) -> bool {
        self.handlers.contains_key(&number)
    }

    /// The handler for `number`, or the generic pass-through.
    pub fn resolve(&self, number: u64) -> Arc<dyn TagHandler> {
        match self.handlers.get(&number) {
            Some(handler) => Arc::clone(handler),
            None => {
                trace!(tag = number, "no handler registered, using generic tag");
                Arc::clone(&self.fallback)
            }
        }
    }

    /// Resolves the number carried by `header` and builds the tag.
    pub fn create(&self, header: Length, child: CborObject) -> Result<Tag> {
        let number = header.try_value()?;
        Tag::with_handler(header, child, self.resolve(number))
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        TagRegistry::new()
    }
}
