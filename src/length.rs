//! Header argument encoding shared by every length-carrying major type.
//!
//! The low five bits of a CBOR initial byte (the "additional information")
//! either hold a value below 24 directly, select a 1/2/4/8 byte big-endian
//! field that follows the initial byte, or (31) mark an indefinite-length item.

use crate::reader::ByteReader;
use crate::{CborError, INDEFINITE, Result};
use num_bigint::BigUint;
use num_traits::ToPrimitive;

const ONE_BYTE: u8 = 24;
const TWO_BYTES: u8 = 25;
const FOUR_BYTES: u8 = 26;
const EIGHT_BYTES: u8 = 27;

/// The argument of a CBOR header: an additional information value plus the
/// length bytes it selects.
///
/// A `Length` can only be built through [`encode_length`],
/// [`encode_length_big`], [`Length::with_additional_information`],
/// [`Length::indefinite`] or [`decode_length`], so the additional information
/// always agrees with the bytes that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Length(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Repr {
    Immediate(u8),
    OneByte(u8),
    TwoBytes(u16),
    FourBytes(u32),
    EightBytes(u64),
    Indefinite,
    // Wider than 64 bits: written as additional information 31 with no
    // length field, the value is only kept in memory.
    Oversized(Box<BigUint>),
}

/// Returns the shortest header argument for `n`.
pub fn encode_length(n: u64) -> Length {
    Length(if n < 24 {
        Repr::Immediate(n as u8)
    } else if n <= u8::MAX as u64 {
        Repr::OneByte(n as u8)
    } else if n <= u16::MAX as u64 {
        Repr::TwoBytes(n as u16)
    } else if n <= u32::MAX as u64 {
        Repr::FourBytes(n as u32)
    } else {
        Repr::EightBytes(n)
    })
}

/// Returns the shortest header argument for an arbitrary non-negative integer.
///
/// Values above `0xFFFF_FFFF_FFFF_FFFF` cannot be carried by any length field.
/// They degrade to additional information 31 with no following bytes, which
/// on the wire reads as "indefinite length". This keeps output compatible with
/// existing encoders and is not reported as an error; callers needing the
/// number back use [`Length::try_value`] and get
/// [`CborError::UnsupportedLength`].
pub fn encode_length_big(n: &BigUint) -> Length {
    match n.to_u64() {
        Some(n) => encode_length(n),
        None => Length(Repr::Oversized(Box::new(n.clone()))),
    }
}

/// Reads the argument selected by `additional_information` from `reader`.
///
/// Accepts any width, shortest or not. Values 28 to 30 are reserved and fail
/// with [`CborError::MalformedHeader`]; 31 yields [`Length::indefinite`].
pub fn decode_length<R>(additional_information: u8, reader: &mut R) -> Result<Length>
where
    R: ByteReader + ?Sized,
{
    Ok(Length(match additional_information {
        0..=23 => Repr::Immediate(additional_information),
        ONE_BYTE => Repr::OneByte(reader.read_u8()?),
        TWO_BYTES => Repr::TwoBytes(reader.read_u16()?),
        FOUR_BYTES => Repr::FourBytes(reader.read_u32()?),
        EIGHT_BYTES => Repr::EightBytes(reader.read_u64()?),
        INDEFINITE => Repr::Indefinite,
        _ => {
            return Err(CborError::MalformedHeader(format!(
                "reserved additional information {additional_information}"
            )));
        }
    }))
}

impl Length {
    /// The "no length, read until break" argument.
    pub fn indefinite() -> Self {
        Length(Repr::Indefinite)
    }

    /// Builds an argument of an explicit width, for encoders that do not want
    /// the shortest form.
    ///
    /// `additional_information` below 24 must equal `n`; 24 to 27 select a
    /// 1, 2, 4 or 8 byte field that must be wide enough for `n`.
    pub fn with_additional_information(additional_information: u8, n: u64) -> Result<Self> {
        let repr = match additional_information {
            0..=23 if n == additional_information as u64 => Repr::Immediate(additional_information),
            ONE_BYTE => Repr::OneByte(narrow(n)?),
            TWO_BYTES => Repr::TwoBytes(narrow(n)?),
            FOUR_BYTES => Repr::FourBytes(narrow(n)?),
            EIGHT_BYTES => Repr::EightBytes(n),
            _ => {
                return Err(CborError::ConstructionError(format!(
                    "additional information {additional_information} cannot carry {n}"
                )));
            }
        };
        Ok(Length(repr))
    }

    /// The five bit additional information value.
    pub fn additional_information(&self) -> u8 {
        match &self.0 {
            Repr::Immediate(n) => *n,
            Repr::OneByte(_) => ONE_BYTE,
            Repr::TwoBytes(_) => TWO_BYTES,
            Repr::FourBytes(_) => FOUR_BYTES,
            Repr::EightBytes(_) => EIGHT_BYTES,
            Repr::Indefinite | Repr::Oversized(_) => INDEFINITE,
        }
    }

    /// The carried value, or `None` for indefinite and oversized arguments.
    pub fn value(&self) -> Option<u64> {
        match &self.0 {
            Repr::Immediate(n) => Some(*n as u64),
            Repr::OneByte(n) => Some(*n as u64),
            Repr::TwoBytes(n) => Some(*n as u64),
            Repr::FourBytes(n) => Some(*n as u64),
            Repr::EightBytes(n) => Some(*n),
            Repr::Indefinite | Repr::Oversized(_) => None,
        }
    }

    /// Like [`Length::value`] for callers that need a concrete number.
    pub fn try_value(&self) -> Result<u64> {
        self.value().ok_or(CborError::UnsupportedLength)
    }

    /// The carried value at full precision, including oversized ones.
    pub fn to_biguint(&self) -> Option<BigUint> {
        match &self.0 {
            Repr::Oversized(n) => Some((**n).clone()),
            _ => self.value().map(BigUint::from),
        }
    }

    /// True when the header reads as additional information 31.
    pub fn is_indefinite(&self) -> bool {
        matches!(self.0, Repr::Indefinite | Repr::Oversized(_))
    }

    /// True for the degraded encoding of a value wider than 64 bits.
    pub fn is_oversized(&self) -> bool {
        matches!(self.0, Repr::Oversized(_))
    }

    /// Number of length bytes following the initial byte.
    pub fn field_len(&self) -> usize {
        match self.0 {
            Repr::OneByte(_) => 1,
            Repr::TwoBytes(_) => 2,
            Repr::FourBytes(_) => 4,
            Repr::EightBytes(_) => 8,
            _ => 0,
        }
    }

    /// Appends the big-endian length field (possibly empty) to `out`.
    pub fn write_field(&self, out: &mut Vec<u8>) {
        match &self.0 {
            Repr::OneByte(n) => out.push(*n),
            Repr::TwoBytes(n) => out.extend_from_slice(&n.to_be_bytes()),
            Repr::FourBytes(n) => out.extend_from_slice(&n.to_be_bytes()),
            Repr::EightBytes(n) => out.extend_from_slice(&n.to_be_bytes()),
            Repr::Immediate(_) | Repr::Indefinite | Repr::Oversized(_) => {}
        }
    }

    /// Appends the full header: initial byte for `major` then the length field.
    pub fn write_header(&self, major: u8, out: &mut Vec<u8>) {
        out.push((major << 5) | self.additional_information());
        self.write_field(out);
    }
}

fn narrow<T: TryFrom<u64>>(n: u64) -> Result<T> {
    T::try_from(n)
        .map_err(|_| CborError::ConstructionError(format!("{n} does not fit the requested width")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    fn roundtrip(n: u64) -> u64 {
        let length = encode_length(n);
        let mut field = Vec::new();
        length.write_field(&mut field);
        let mut reader = SliceReader::new(&field);
        let decoded = decode_length(length.additional_information(), &mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        decoded.value().unwrap()
    }

    #[test]
    fn test_shortest_width_boundaries() {
        let cases: [(u64, u8, usize); 10] = [
            (0, 0, 0),
            (23, 23, 0),
            (24, 24, 1),
            (255, 24, 1),
            (256, 25, 2),
            (65535, 25, 2),
            (65536, 26, 4),
            (u32::MAX as u64, 26, 4),
            (u32::MAX as u64 + 1, 27, 8),
            (u64::MAX, 27, 8),
        ];
        for (n, ai, width) in cases {
            let length = encode_length(n);
            assert_eq!(length.additional_information(), ai, "ai for {n}");
            assert_eq!(length.field_len(), width, "width for {n}");
            assert_eq!(roundtrip(n), n);
        }
    }

    #[test]
    fn test_oversized_falls_back_to_indefinite() {
        let n = BigUint::from(u64::MAX) + 1u32;
        let length = encode_length_big(&n);
        assert_eq!(length.additional_information(), 31);
        assert!(length.is_oversized());
        assert_eq!(length.field_len(), 0);
        assert_eq!(length.value(), None);
        assert!(matches!(length.try_value(), Err(CborError::UnsupportedLength)));
        assert_eq!(length.to_biguint(), Some(n));

        let max = BigUint::from(u64::MAX);
        assert_eq!(encode_length_big(&max), encode_length(u64::MAX));
    }

    #[test]
    fn test_reserved_additional_information() {
        for ai in 28..=30 {
            let mut reader = SliceReader::new(&[]);
            assert!(matches!(
                decode_length(ai, &mut reader),
                Err(CborError::MalformedHeader(_))
            ));
        }
        let mut reader = SliceReader::new(&[]);
        assert!(decode_length(31, &mut reader).unwrap().is_indefinite());
    }

    #[test]
    fn test_truncated_field() {
        let mut reader = SliceReader::new(&[0x01, 0x02, 0x03]);
        assert!(matches!(
            decode_length(26, &mut reader),
            Err(CborError::TruncatedInput)
        ));
    }

    #[test]
    fn test_non_shortest_width_is_kept() {
        let length = Length::with_additional_information(25, 5).unwrap();
        let mut out = Vec::new();
        length.write_header(0, &mut out);
        assert_eq!(out, [0x19, 0x00, 0x05]);

        let mut reader = SliceReader::new(&out[1..]);
        let decoded = decode_length(25, &mut reader).unwrap();
        assert_eq!(decoded, length);
        assert_ne!(decoded, encode_length(5));

        assert!(Length::with_additional_information(24, 256).is_err());
        assert!(Length::with_additional_information(3, 4).is_err());
        assert!(Length::with_additional_information(28, 1).is_err());
    }
}
