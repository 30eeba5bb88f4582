use num_enum::TryFromPrimitive;

/// What kind of placeholder a [`crate::registry::FormatEntry`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FormatEntryKind {
    Literal = 0x1,
    Expando = 0x2,
    Basic = 0x3,
    Compound = 0x4,
}

/// A format selector code.
///
/// Unlike [`Tag`](crate::tag::Tag) or [`FormatEntryKind`], a selector is not
/// modeled as a closed Rust enum: a host can register a format entry whose
/// selector byte is outside the documented closed set (a forward-compatible
/// or simply buggy call site), and the emitter's contract is to render such
/// an entry as `"<BadFormat>"` rather than reject the registration. A
/// newtype over the raw code — with associated constants for the known set —
/// models this the same way a `BlockId`/`AbbreviationId` wraps a raw integer
/// rather than enumerate every possible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatSelector(u8);

impl FormatSelector {
    // Expando selectors
    pub const HASH: Self = Self(0x01);
    pub const HOST: Self = Self(0x02);
    pub const APP: Self = Self(0x03);
    pub const SOURCE: Self = Self(0x05);
    pub const WALLCLOCK: Self = Self(0x06);
    pub const TIMESTAMP: Self = Self(0x07);
    pub const CALLBACK: Self = Self(0x08);
    pub const REQUEST: Self = Self(0x09);

    // Placeholder selectors
    pub const PERCENT: Self = Self(0x11);
    pub const BOOL: Self = Self(0x12);
    pub const NUMBER: Self = Self(0x13);
    pub const STRING: Self = Self(0x14);
    pub const DATEISO: Self = Self(0x15);
    pub const DATEUTC: Self = Self(0x16);
    pub const DATELOCAL: Self = Self(0x17);
    pub const GENERAL: Self = Self(0x18);
    pub const OBJECT: Self = Self(0x19);
    pub const ARRAY: Self = Self(0x1A);

    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Whether this code is one of the documented closed-set selectors.
    #[must_use]
    pub fn is_known(self) -> bool {
        const KNOWN: &[FormatSelector] = &[
            FormatSelector::HASH,
            FormatSelector::HOST,
            FormatSelector::APP,
            FormatSelector::SOURCE,
            FormatSelector::WALLCLOCK,
            FormatSelector::TIMESTAMP,
            FormatSelector::CALLBACK,
            FormatSelector::REQUEST,
            FormatSelector::PERCENT,
            FormatSelector::BOOL,
            FormatSelector::NUMBER,
            FormatSelector::STRING,
            FormatSelector::DATEISO,
            FormatSelector::DATEUTC,
            FormatSelector::DATELOCAL,
            FormatSelector::GENERAL,
            FormatSelector::OBJECT,
            FormatSelector::ARRAY,
        ];
        KNOWN.contains(&self)
    }
}

impl std::fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors_round_trip_raw() {
        assert_eq!(FormatSelector::from_raw(0x14), FormatSelector::STRING);
        assert!(FormatSelector::STRING.is_known());
    }

    #[test]
    fn unknown_selector_is_not_known() {
        let sel = FormatSelector::from_raw(0x99);
        assert!(!sel.is_known());
    }

    #[test]
    fn entry_kind_round_trips() {
        assert_eq!(FormatEntryKind::try_from(0x3u8), Ok(FormatEntryKind::Basic));
        assert!(FormatEntryKind::try_from(0x0u8).is_err());
    }
}
