//! Streaming output of CBOR items to any [`std::io::Write`].
//!
//! Complete objects are written with [`Encoder::encode`]. Indefinite-length
//! items can also be produced piece by piece: open one with a `begin_*`
//! method, write its contents, then close it with [`Encoder::end`].

use crate::length::encode_length;
use crate::object::CborObject;
use crate::{
    BREAK, CborError, INDEFINITE, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_TAG, MAJOR_TEXT, Result,
};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Bytes,
    Text,
    Array,
    // Items written so far, keys and values counted separately
    Map(usize),
}

/// Writes CBOR items to `W`.
///
/// # Example
/// ```
/// use cbor_object::{CborObject, Encoder};
///
/// let mut encoder = Encoder::new(Vec::new());
/// encoder.begin_array().unwrap();
/// encoder.encode(&CborObject::unsigned(1)).unwrap();
/// encoder.encode(&CborObject::text("a")).unwrap();
/// encoder.end().unwrap();
/// assert_eq!(encoder.finish().unwrap(), [0x9f, 0x01, 0x61, 0x61, 0xff]);
/// ```
#[derive(Debug)]
pub struct Encoder<W: Write> {
    writer: W,
    open: Vec<Frame>,
    pending_tags: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder {
            writer,
            open: Vec::new(),
            pending_tags: 0,
        }
    }

    /// Number of indefinite-length items currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Returns the writer without checking for open items.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a complete item.
    ///
    /// Inside an open byte or text string only definite strings of the same
    /// major type are accepted.
    pub fn encode(&mut self, object: &CborObject) -> Result<()> {
        match self.open.last() {
            Some(Frame::Bytes) if !matches!(object, CborObject::ByteString(_)) => {
                return Err(CborError::ConstructionError(
                    "indefinite byte strings only hold definite byte string chunks".to_string(),
                ));
            }
            Some(Frame::Text) if !matches!(object, CborObject::TextString(_)) => {
                return Err(CborError::ConstructionError(
                    "indefinite text strings only hold definite text string chunks".to_string(),
                ));
            }
            _ => {}
        }
        self.start_item();
        self.writer.write_all(&object.to_bytes())?;
        Ok(())
    }

    /// Writes a tag header; the next item written becomes its child.
    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.reject_in_string("a tag")?;
        let mut header = Vec::with_capacity(9);
        encode_length(tag).write_header(MAJOR_TAG, &mut header);
        self.writer.write_all(&header)?;
        self.pending_tags += 1;
        Ok(())
    }

    pub fn begin_bytes(&mut self) -> Result<()> {
        self.begin(MAJOR_BYTES, Frame::Bytes)
    }

    pub fn begin_text(&mut self) -> Result<()> {
        self.begin(MAJOR_TEXT, Frame::Text)
    }

    pub fn begin_array(&mut self) -> Result<()> {
        self.begin(MAJOR_ARRAY, Frame::Array)
    }

    pub fn begin_map(&mut self) -> Result<()> {
        self.begin(MAJOR_MAP, Frame::Map(0))
    }

    /// Closes the innermost open item with a break marker.
    pub fn end(&mut self) -> Result<()> {
        if self.pending_tags > 0 {
            return Err(CborError::ConstructionError(
                "tag written without a child".to_string(),
            ));
        }
        match self.open.last() {
            None => Err(CborError::ConstructionError(
                "no indefinite-length item is open".to_string(),
            )),
            Some(Frame::Map(items)) if items % 2 != 0 => Err(CborError::ConstructionError(
                "map key written without a value".to_string(),
            )),
            Some(_) => {
                self.open.pop();
                self.writer.write_all(&[BREAK])?;
                Ok(())
            }
        }
    }

    /// Flushes and returns the writer. Fails if an item is still open.
    pub fn finish(mut self) -> Result<W> {
        if !self.open.is_empty() {
            return Err(CborError::ConstructionError(format!(
                "{} indefinite-length item(s) still open",
                self.open.len()
            )));
        }
        if self.pending_tags > 0 {
            return Err(CborError::ConstructionError(
                "tag written without a child".to_string(),
            ));
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn begin(&mut self, major: u8, frame: Frame) -> Result<()> {
        self.reject_in_string("a nested indefinite-length item")?;
        self.start_item();
        self.writer.write_all(&[(major << 5) | INDEFINITE])?;
        self.open.push(frame);
        Ok(())
    }

    fn reject_in_string(&self, what: &str) -> Result<()> {
        match self.open.last() {
            Some(Frame::Bytes | Frame::Text) => Err(CborError::ConstructionError(format!(
                "{what} cannot appear inside an indefinite string"
            ))),
            _ => Ok(()),
        }
    }

    // Tags are prefixes, so only the item they wrap counts toward the map.
    fn start_item(&mut self) {
        self.pending_tags = 0;
        if let Some(Frame::Map(items)) = self.open.last_mut() {
            *items += 1;
        }
    }
}
