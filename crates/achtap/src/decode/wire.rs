//! Tag/varint wire primitives.

use prost::encoding::decode_varint;
use strum::{Display, FromRepr};
use thiserror::Error;

/// Wire kind carried in the low three bits of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum WireKind {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

/// Low-level reason a buffer could not be read.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid varint: {0}")]
    Varint(#[from] prost::DecodeError),

    #[error("tag {0:#x} does not fit in 32 bits")]
    TagOverflow(u64),

    #[error("invalid field number 0")]
    ZeroField,

    #[error("unsupported wire kind {0}")]
    UnsupportedKind(u8),

    #[error("need {needed} bytes, {remaining} remaining")]
    Truncated { needed: u64, remaining: usize },
}

/// A decoded tag: field number plus the raw wire-kind bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub field: u32,
    pub kind_bits: u8,
}

impl Tag {
    pub fn kind(&self) -> Option<WireKind> {
        WireKind::from_repr(self.kind_bits)
    }
}

pub fn read_varint(buf: &mut &[u8]) -> Result<u64, WireError> {
    Ok(decode_varint(buf)?)
}

pub fn read_tag(buf: &mut &[u8]) -> Result<Tag, WireError> {
    let key = read_varint(buf)?;
    let key = u32::try_from(key).map_err(|_| WireError::TagOverflow(key))?;
    let field = key >> 3;
    if field == 0 {
        return Err(WireError::ZeroField);
    }
    Ok(Tag {
        field,
        kind_bits: (key & 0x07) as u8,
    })
}

/// Split `len` bytes off the front of `buf`.
pub fn take<'a>(buf: &mut &'a [u8], len: u64) -> Result<&'a [u8], WireError> {
    let remaining = buf.len();
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= remaining)
        .ok_or(WireError::Truncated {
            needed: len,
            remaining,
        })?;
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Read a length prefix and return the delimited bytes.
pub fn read_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], WireError> {
    let len = read_varint(buf)?;
    take(buf, len)
}

/// Skip the value of a non-delimited field.
pub fn skip_value(buf: &mut &[u8], kind: WireKind) -> Result<(), WireError> {
    match kind {
        WireKind::Varint => read_varint(buf).map(drop),
        WireKind::Fixed64 => take(buf, 8).map(drop),
        WireKind::Fixed32 => take(buf, 4).map(drop),
        WireKind::LengthDelimited => read_length_delimited(buf).map(drop),
        WireKind::StartGroup | WireKind::EndGroup => Err(WireError::UnsupportedKind(kind as u8)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_varint_multi_byte() {
        let bytes = [0xAC, 0x02, 0xFF];
        let mut buf = &bytes[..];
        assert_eq!(read_varint(&mut buf).unwrap(), 300);
        assert_eq!(buf, &[0xFF]);
    }

    #[test]
    fn test_read_varint_truncated() {
        let bytes = [0x80, 0x80];
        let mut buf = &bytes[..];
        assert!(read_varint(&mut buf).is_err());
    }

    #[test]
    fn test_read_tag_splits_field_and_kind() {
        // field 5, length-delimited
        let bytes = [(5 << 3) | 2];
        let mut buf = &bytes[..];
        let tag = read_tag(&mut buf).unwrap();
        assert_eq!(tag.field, 5);
        assert_eq!(tag.kind(), Some(WireKind::LengthDelimited));
    }

    #[test]
    fn test_read_tag_rejects_zero_field() {
        let bytes = [0x00];
        let mut buf = &bytes[..];
        assert!(matches!(read_tag(&mut buf), Err(WireError::ZeroField)));
    }

    #[test]
    fn test_unknown_kind_bits() {
        let bytes = [(1 << 3) | 7];
        let mut buf = &bytes[..];
        let tag = read_tag(&mut buf).unwrap();
        assert_eq!(tag.kind(), None);
    }

    #[test]
    fn test_length_delimited_beyond_buffer() {
        let bytes = [0x05, 0x01, 0x02];
        let mut buf = &bytes[..];
        assert!(matches!(
            read_length_delimited(&mut buf),
            Err(WireError::Truncated {
                needed: 5,
                remaining: 2
            })
        ));
    }

    #[test]
    fn test_skip_fixed_values() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut buf = &bytes[..];
        skip_value(&mut buf, WireKind::Fixed64).unwrap();
        assert_eq!(buf, &[9]);
        assert!(skip_value(&mut buf, WireKind::Fixed32).is_err());
    }
}
