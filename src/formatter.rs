use std::fmt::Write as _;

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};

/// An output accumulator exposing primitive emit operations.
///
/// Stateless beyond its growable byte buffer — the emitter (`crate::emit`)
/// owns all walking/matching logic and only ever calls through to these
/// primitives.
#[derive(Debug, Default)]
pub struct Formatter {
    buf: String,
}

impl Formatter {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    #[must_use]
    pub fn with_capacity(hint: usize) -> Self {
        Self {
            buf: String::with_capacity(hint),
        }
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.buf
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn emit_literal(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Emit `text` wrapped in `"`, with JSON-style escaping.
    ///
    /// ASCII printable characters pass through unescaped; C0 controls and
    /// the usual named escapes (`\n`, `\t`, …) are escaped; anything outside
    /// ASCII is decoded to its code point and emitted as a `\uXXXX` escape,
    /// with code points above the BMP split into a UTF-16 surrogate pair.
    /// `text` is always a valid `&str`, so the "malformed byte" case from
    /// the wire-format string semantics never applies here.
    pub fn emit_json_string(&mut self, text: &str) {
        self.buf.push('"');
        for c in text.chars() {
            match c {
                '"' => self.buf.push_str("\\\""),
                '\\' => self.buf.push_str("\\\\"),
                '\u{8}' => self.buf.push_str("\\b"),
                '\u{c}' => self.buf.push_str("\\f"),
                '\n' => self.buf.push_str("\\n"),
                '\r' => self.buf.push_str("\\r"),
                '\t' => self.buf.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.buf, "\\u{:04x}", c as u32);
                }
                c if (c as u32) <= 0x7E => self.buf.push(c),
                c if (c as u32) <= 0xFFFF => {
                    let _ = write!(self.buf, "\\u{:04x}", c as u32);
                }
                c => {
                    let mut units = [0u16; 2];
                    for unit in c.encode_utf16(&mut units) {
                        let _ = write!(self.buf, "\\u{unit:04x}");
                    }
                }
            }
        }
        self.buf.push('"');
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.buf.push_str(if value { "true" } else { "false" });
    }

    /// `NaN`/`+-inf` render as `null`; integer-valued doubles render without
    /// a decimal point; everything else renders with Rust's shortest
    /// round-tripping decimal form (which already has no trailing zeros).
    pub fn emit_number(&mut self, value: f64) {
        if value.is_nan() || value.is_infinite() {
            self.buf.push_str("null");
        } else if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
            let _ = write!(self.buf, "{}", value as i64);
        } else {
            let _ = write!(self.buf, "{value}");
        }
    }

    pub fn emit_sentinel(&mut self, text: &'static str) {
        self.buf.push_str(text);
    }

    fn millis_to_utc(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(|| {
            if ms < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            }
        })
    }

    /// `YYYY-MM-DDTHH:MM:SS.mmmZ`, optionally surrounded by `"`.
    pub fn emit_date_iso(&mut self, ms: i64, quoted: bool) {
        let dt = Self::millis_to_utc(ms);
        let text = dt.to_rfc3339_opts(SecondsFormat::Millis, true);
        if quoted {
            self.buf.push('"');
        }
        self.buf.push_str(&text);
        if quoted {
            self.buf.push('"');
        }
    }

    /// RFC-1123-ish: `Wed, 21 Jan 2004 05:06:07 GMT`.
    pub fn emit_date_utc(&mut self, ms: i64, quoted: bool) {
        let dt = Self::millis_to_utc(ms);
        let text = dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if quoted {
            self.buf.push('"');
        }
        self.buf.push_str(&text);
        if quoted {
            self.buf.push('"');
        }
    }

    /// `Wed Jan 21 2004 05:06:07 GMT+hhmm (Local)`, in the embedder process's
    /// local timezone offset. Chrono carries no timezone-name database, so
    /// the parenthesized zone label is always `(Local)` rather than an IANA
    /// abbreviation — see the grounding ledger for this decision.
    pub fn emit_date_local(&mut self, ms: i64, quoted: bool) {
        let utc = Self::millis_to_utc(ms);
        let dt: DateTime<Local> = DateTime::from(utc);
        let text = format!("{} (Local)", dt.format("%a %b %d %Y %H:%M:%S GMT%z"));
        if quoted {
            self.buf.push('"');
        }
        self.buf.push_str(&text);
        if quoted {
            self.buf.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_valued_double_has_no_decimal_point() {
        let mut f = Formatter::new();
        f.emit_number(1.0);
        assert_eq!(f.as_str(), "1");
    }

    #[test]
    fn fractional_double_keeps_decimal() {
        let mut f = Formatter::new();
        f.emit_number(1.5);
        assert_eq!(f.as_str(), "1.5");
    }

    #[test]
    fn nan_and_infinities_render_as_null() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut f = Formatter::new();
            f.emit_number(v);
            assert_eq!(f.as_str(), "null");
        }
    }

    #[test]
    fn ascii_string_passes_through_unescaped() {
        let mut f = Formatter::new();
        f.emit_json_string("world");
        assert_eq!(f.as_str(), "\"world\"");
    }

    #[test]
    fn control_and_named_escapes() {
        let mut f = Formatter::new();
        f.emit_json_string("a\nb\"c\\d");
        assert_eq!(f.as_str(), "\"a\\nb\\\"c\\\\d\"");
    }

    #[test]
    fn non_ascii_code_point_is_escaped() {
        let mut f = Formatter::new();
        f.emit_json_string("caf\u{e9}");
        assert_eq!(f.as_str(), "\"caf\\u00e9\"");
    }

    #[test]
    fn supplementary_plane_emits_surrogate_pair() {
        let mut f = Formatter::new();
        f.emit_json_string("\u{1F600}");
        assert_eq!(f.as_str(), "\"\\ud83d\\ude00\"");
    }

    #[test]
    fn epoch_iso_date() {
        let mut f = Formatter::new();
        f.emit_date_iso(0, false);
        assert_eq!(f.as_str(), "1970-01-01T00:00:00.000Z");
    }
}
