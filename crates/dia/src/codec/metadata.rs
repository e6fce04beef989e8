//! The Bion type-metadata byte.
//!
//! ```text
//!   bit  7        6       5     4         3..0
//!        OVERFLOW CUSTOM  NULL  ANNOTATED kind tag
//! ```
//!
//! The low nibble is a [`Kind`] tag (1-10) or [`TAG_REFERENCE`]; 0 and the
//! other values are invalid. The flag bits are validated per kind.

use crate::error::DecodeError;
use crate::model::Kind;

/// Low-nibble tag of a back-reference.
pub const TAG_REFERENCE: u8 = 0x0F;

/// Annotation block follows the metadata varint.
pub const FLAG_ANNOTATED: u8 = 0x10;
/// Null of the tagged kind; no payload.
pub const FLAG_NULL: u8 = 0x20;
/// Kind-specific alternative encoding (see [`Tag::allows`]).
pub const FLAG_CUSTOM: u8 = 0x40;
/// A metadata varint follows the type byte; absent means 0.
pub const FLAG_OVERFLOW: u8 = 0x80;

const TAG_MASK: u8 = 0x0F;

/// What the low nibble names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Kind(Kind),
    Reference,
}

impl Tag {
    fn to_nibble(self) -> u8 {
        match self {
            Tag::Kind(kind) => kind.tag(),
            Tag::Reference => TAG_REFERENCE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Tag::Kind(kind) => kind.name(),
            Tag::Reference => "Reference",
        }
    }

    /// Flags this tag may carry.
    ///
    /// CUSTOM means: Boolean true; Integer/Decimal mantissa stored as
    /// two's complement bytes; Reference to a Sequence rather than a Record.
    fn allows(self) -> u8 {
        match self {
            Tag::Kind(Kind::Boolean) => FLAG_ANNOTATED | FLAG_NULL | FLAG_CUSTOM,
            Tag::Kind(Kind::Integer | Kind::Decimal) => {
                FLAG_ANNOTATED | FLAG_NULL | FLAG_CUSTOM | FLAG_OVERFLOW
            }
            Tag::Kind(Kind::Timestamp | Kind::Duration) => FLAG_ANNOTATED | FLAG_NULL,
            Tag::Kind(
                Kind::String | Kind::Symbol | Kind::Blob | Kind::Sequence | Kind::Record,
            ) => FLAG_ANNOTATED | FLAG_NULL | FLAG_OVERFLOW,
            Tag::Reference => FLAG_CUSTOM | FLAG_OVERFLOW,
        }
    }
}

/// A decoded or to-be-encoded type-metadata byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeByte {
    pub tag: Tag,
    flags: u8,
}

impl TypeByte {
    pub fn new(tag: Tag) -> Self {
        Self { tag, flags: 0 }
    }

    pub fn kind(kind: Kind) -> Self {
        Self::new(Tag::Kind(kind))
    }

    pub fn reference() -> Self {
        Self::new(Tag::Reference)
    }

    /// Sets `flag` when `on` is true.
    pub fn with(mut self, flag: u8, on: bool) -> Self {
        if on {
            self.flags |= flag;
        }
        self
    }

    pub fn has(self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn flags(self) -> u8 {
        self.flags
    }

    pub fn to_byte(self) -> u8 {
        self.flags | self.tag.to_nibble()
    }

    /// Parses and validates a type byte read at `offset`.
    pub fn from_byte(byte: u8, offset: usize) -> Result<Self, DecodeError> {
        let nibble = byte & TAG_MASK;
        let tag = match nibble {
            TAG_REFERENCE => Tag::Reference,
            _ => Kind::from_tag(nibble)
                .map(Tag::Kind)
                .ok_or(DecodeError::InvalidKind {
                    offset,
                    tag: nibble,
                })?,
        };
        let flags = byte & !TAG_MASK;
        let invalid = DecodeError::InvalidFlags {
            offset,
            kind: tag.name(),
            flags,
        };
        if flags & !tag.allows() != 0 {
            return Err(invalid);
        }
        // A null carries neither metadata nor a custom payload.
        if flags & FLAG_NULL != 0 && flags & (FLAG_CUSTOM | FLAG_OVERFLOW) != 0 {
            return Err(invalid);
        }
        Ok(Self { tag, flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_layout() {
        let t = TypeByte::kind(Kind::Record)
            .with(FLAG_ANNOTATED, true)
            .with(FLAG_OVERFLOW, true)
            .with(FLAG_NULL, false);
        assert_eq!(t.to_byte(), 0x80 | 0x10 | 10);
        assert_eq!(TypeByte::from_byte(t.to_byte(), 0).unwrap(), t);

        let r = TypeByte::reference().with(FLAG_CUSTOM, true);
        assert_eq!(r.to_byte(), 0x4F);
        assert_eq!(TypeByte::from_byte(0x4F, 0).unwrap().tag, Tag::Reference);
    }

    #[test]
    fn test_invalid_tags() {
        for nibble in [0u8, 11, 12, 13, 14] {
            assert_eq!(
                TypeByte::from_byte(nibble, 3),
                Err(DecodeError::InvalidKind {
                    offset: 3,
                    tag: nibble
                })
            );
        }
    }

    #[test]
    fn test_invalid_flags() {
        // Timestamp has no metadata varint.
        assert!(matches!(
            TypeByte::from_byte(FLAG_OVERFLOW | Kind::Timestamp.tag(), 0),
            Err(DecodeError::InvalidFlags { .. })
        ));
        // String has no custom encoding.
        assert!(TypeByte::from_byte(FLAG_CUSTOM | Kind::String.tag(), 0).is_err());
        // References cannot be annotated or null.
        assert!(TypeByte::from_byte(FLAG_ANNOTATED | TAG_REFERENCE, 0).is_err());
        assert!(TypeByte::from_byte(FLAG_NULL | TAG_REFERENCE, 0).is_err());
        // Null with a payload flag.
        assert!(TypeByte::from_byte(FLAG_NULL | FLAG_CUSTOM | Kind::Boolean.tag(), 0).is_err());
        assert!(TypeByte::from_byte(FLAG_NULL | FLAG_ANNOTATED | Kind::Record.tag(), 0).is_ok());
    }
}
