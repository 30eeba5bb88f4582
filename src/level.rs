use bitflags::bitflags;

bitflags! {
    /// Logging level mask.
    ///
    /// Levels are cumulative bitmasks rather than a linear ordering: a level
    /// is enabled under a given mask iff `(level.bits() & mask.bits()) ==
    /// level.bits()`, see [`Level::enabled_under`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Level: u32 {
        const OFF    = 0x00;
        const FATAL  = 0x01;
        const ERROR  = 0x03;
        const WARN   = 0x07;
        const INFO   = 0x0F;
        const DETAIL = 0x1F;
        const DEBUG  = 0x3F;
        const TRACE  = 0x7F;
        const ALL    = 0xFF;
    }
}

impl Level {
    /// Returns the canonical display name for one of the named level
    /// constants. Levels that are not one of the named constants (a
    /// caller-constructed arbitrary mask) fall back to `"UNKNOWN"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::OFF => "OFF",
            Self::FATAL => "FATAL",
            Self::ERROR => "ERROR",
            Self::WARN => "WARN",
            Self::INFO => "INFO",
            Self::DETAIL => "DETAIL",
            Self::DEBUG => "DEBUG",
            Self::TRACE => "TRACE",
            Self::ALL => "ALL",
            _ => "UNKNOWN",
        }
    }

    /// Whether `self` is enabled under the given enabled-level mask.
    #[must_use]
    pub fn enabled_under(self, enabled: Level) -> bool {
        (self.bits() & enabled.bits()) == self.bits()
    }

    /// Reinterpret a raw wire value (as carried in the `MsgLevel` slot) as a
    /// `Level`. Unknown bit patterns are preserved rather than rejected,
    /// since the mask comparison in [`Self::enabled_under`] is well defined
    /// for any `u32`.
    #[must_use]
    pub fn from_bits_truncate_wire(raw: u32) -> Level {
        Level::from_bits_retain(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_enabled_under_info() {
        assert!(Level::INFO.enabled_under(Level::INFO));
    }

    #[test]
    fn debug_not_enabled_under_info() {
        assert!(!Level::DEBUG.enabled_under(Level::INFO));
    }

    #[test]
    fn off_always_enabled() {
        assert!(Level::OFF.enabled_under(Level::OFF));
        assert!(Level::OFF.enabled_under(Level::ALL));
    }

    #[test]
    fn names_match_constants() {
        assert_eq!(Level::INFO.name(), "INFO");
        assert_eq!(Level::TRACE.name(), "TRACE");
    }
}
