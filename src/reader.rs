//! Byte sources the decoder reads from.

use crate::{CborError, Result};
use std::io::{self, Read};

// Upper bound on a single allocation step while reading a string payload, so
// a header claiming a huge length fails on truncation instead of exhausting
// memory first.
const READ_CHUNK: usize = 64 * 1024;

/// A cursor over encoded bytes.
pub trait ByteReader {
    /// Fills `buf` completely, or fails with [`CborError::TruncatedInput`].
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Returns the next byte without consuming it, `None` at end of stream.
    fn peek_byte(&mut self) -> Result<Option<u8>>;

    /// Reads exactly `n` bytes.
    fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n.min(READ_CHUNK));
        let mut remaining = n;
        while remaining > 0 {
            let take = remaining.min(READ_CHUNK);
            let start = out.len();
            out.resize(start + take, 0);
            self.read_into(&mut out[start..])?;
            remaining -= take;
        }
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }
}

impl<T: ByteReader + ?Sized> ByteReader for &mut T {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_into(buf)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        (**self).peek_byte()
    }

    fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).read_exactly(n)
    }
}

/// Reads from an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader { data, position: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CborError::TruncatedInput);
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }
}

impl ByteReader for SliceReader<'_> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        buf.copy_from_slice(self.take(buf.len())?);
        Ok(())
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.data.get(self.position).copied())
    }

    fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        self.take(n).map(<[u8]>::to_vec)
    }
}

/// Adapts any [`std::io::Read`] into a [`ByteReader`] with a one byte
/// lookahead.
#[derive(Debug)]
pub struct IoReader<R: Read> {
    reader: R,
    peeked: Option<u8>,
}

impl<R: Read> IoReader<R> {
    pub fn new(reader: R) -> Self {
        IoReader {
            reader,
            peeked: None,
        }
    }

    /// Returns the wrapped reader. A byte consumed by `peek_byte` and not
    /// yet read is lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteReader for IoReader<R> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let rest = match self.peeked.take() {
            Some(byte) => {
                buf[0] = byte;
                &mut buf[1..]
            }
            None => buf,
        };
        self.reader.read_exact(rest).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => CborError::TruncatedInput,
            _ => CborError::Io(e),
        })
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            let mut buf = [0u8; 1];
            loop {
                match self.reader.read(&mut buf) {
                    Ok(0) => return Ok(None),
                    Ok(_) => {
                        self.peeked = Some(buf[0]);
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(self.peeked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_reader_tracks_position() {
        let mut reader = SliceReader::new(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(reader.peek_byte().unwrap(), Some(0x01));
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_exactly(3).unwrap(), vec![0x03, 0x04, 0x05]);
        assert!(reader.is_empty());
        assert_eq!(reader.peek_byte().unwrap(), None);
        assert!(matches!(reader.read_u8(), Err(CborError::TruncatedInput)));
    }

    #[test]
    fn test_slice_reader_rejects_oversized_read() {
        let mut reader = SliceReader::new(&[0u8; 4]);
        assert!(matches!(
            reader.read_exactly(usize::MAX),
            Err(CborError::TruncatedInput)
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_io_reader_peek_then_read() {
        let data: &[u8] = &[0xAA, 0xBB, 0xCC];
        let mut reader = IoReader::new(data);
        assert_eq!(reader.peek_byte().unwrap(), Some(0xAA));
        assert_eq!(reader.peek_byte().unwrap(), Some(0xAA));
        assert_eq!(reader.read_u16().unwrap(), 0xAABB);
        assert_eq!(reader.read_u8().unwrap(), 0xCC);
        assert_eq!(reader.peek_byte().unwrap(), None);
    }

    #[test]
    fn test_io_reader_truncation() {
        let data: &[u8] = &[0x00, 0x01];
        let mut reader = IoReader::new(data);
        assert!(matches!(reader.read_u32(), Err(CborError::TruncatedInput)));

        // Chunked reads still stop at the end of the stream
        let mut reader = IoReader::new(&[0u8; 10][..]);
        assert!(matches!(
            reader.read_exactly(1 << 20),
            Err(CborError::TruncatedInput)
        ));
    }
}
