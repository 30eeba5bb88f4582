use num_enum::TryFromPrimitive;

/// The wire tag carried alongside every `(tag, data)` slot in the raw event
/// stream. Disjoint by construction (`#[repr(u8)]` with [`TryFromPrimitive`]),
/// matching the taxonomy this crate's columnar layout is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Tag {
    // Control
    End = 0x01,
    LParen = 0x02,
    RParen = 0x03,
    LBrack = 0x04,
    RBrack = 0x05,

    // Value
    Undefined = 0x11,
    Null = 0x12,
    Bool = 0x13,
    Number = 0x14,
    StringIdx = 0x15,
    Date = 0x16,

    // Structural
    PropertyRecord = 0x21,
    BadFormat = 0x22,
    Cycle = 0x23,
    Opaque = 0x24,
    DepthBoundObject = 0x25,
    LengthBoundObject = 0x26,
    DepthBoundArray = 0x27,
    LengthBoundArray = 0x28,
}

impl Tag {
    /// Decode a raw wire byte, falling back to [`Tag::Opaque`] for a byte
    /// outside the taxonomy rather than failing the whole ingest call. The
    /// caller is expected to log the fallback (see `ingest::decode_tag`).
    #[must_use]
    pub fn from_wire_or_opaque(raw: u8) -> (Tag, bool) {
        match Tag::try_from(raw) {
            Ok(tag) => (tag, true),
            Err(_) => (Tag::Opaque, false),
        }
    }

    /// Whether this tag opens a structured region.
    #[must_use]
    pub fn is_opener(self) -> bool {
        matches!(self, Tag::LParen | Tag::LBrack)
    }

    /// Whether this tag closes a structured region.
    #[must_use]
    pub fn is_closer(self) -> bool {
        matches!(self, Tag::RParen | Tag::RBrack)
    }

    /// Whether this slot carries an associated string in the block's string
    /// map rather than (or in addition to) a numeric payload.
    #[must_use]
    pub fn carries_string(self) -> bool {
        matches!(self, Tag::StringIdx | Tag::PropertyRecord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_bytes() {
        assert_eq!(Tag::try_from(0x01u8), Ok(Tag::End));
        assert_eq!(Tag::try_from(0x15u8), Ok(Tag::StringIdx));
    }

    #[test]
    fn unknown_byte_falls_back_to_opaque() {
        let (tag, known) = Tag::from_wire_or_opaque(0xFF);
        assert_eq!(tag, Tag::Opaque);
        assert!(!known);
    }

    #[test]
    fn opener_closer_classification() {
        assert!(Tag::LParen.is_opener());
        assert!(Tag::LBrack.is_opener());
        assert!(Tag::RParen.is_closer());
        assert!(!Tag::Number.is_opener());
    }
}
