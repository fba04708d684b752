//! Microsecond-resolution timestamp handling.
//!
//! Tar headers carry whole seconds; PAX records carry decimal seconds with an
//! optional fraction of up to nanosecond precision. Both are reduced to
//! microseconds since the Unix epoch, rounding toward negative infinity, which
//! is the resolution the canonical header encoding works at.
//!
//! # Example
//!
//! ```rust
//! use tardigest::Timestamp;
//!
//! let ts = Timestamp::parse_pax(b"1350244992.023960108").unwrap();
//! assert_eq!(ts.as_unix_micros(), 1_350_244_992_023_960);
//!
//! let before_epoch = Timestamp::parse_pax(b"-1.5").unwrap();
//! assert_eq!(before_epoch.as_unix_micros(), -1_500_000);
//! ```

/// Microsecond offset of 0001-01-01T00:00:00Z from the Unix epoch.
///
/// Timestamps a header does not carry (access and change times of plain
/// ustar entries, every time of a global PAX header) are encoded as this
/// value.
pub const UNSET_MICROS: i64 = -62_135_596_800_000_000;

const MICROS_PER_SECOND: i64 = 1_000_000;
const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// A point in time as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    /// Creates a timestamp from microseconds since the Unix epoch.
    pub fn from_unix_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Creates a timestamp from whole seconds since the Unix epoch.
    ///
    /// Saturates for values beyond the representable microsecond range.
    pub fn from_unix_secs(secs: i64) -> Self {
        Self {
            micros: secs.saturating_mul(MICROS_PER_SECOND),
        }
    }

    /// Parses a PAX time value such as `1350244992.023960108` or `-1.5`.
    ///
    /// Fractions beyond nanoseconds are truncated. Returns `None` for
    /// anything that is not `[-]digits[.digits]`.
    pub fn parse_pax(value: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(value).ok()?;
        let (secs_text, frac_text) = match text.split_once('.') {
            Some((s, f)) => (s, f),
            None => (text, ""),
        };
        let negative = secs_text.starts_with('-');
        let secs: i64 = secs_text.parse().ok()?;

        if !frac_text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut nanos: i128 = 0;
        for i in 0..9 {
            let digit = frac_text.as_bytes().get(i).map_or(0, |b| b - b'0');
            nanos = nanos * 10 + i128::from(digit);
        }
        if negative {
            nanos = -nanos;
        }

        let total_nanos = i128::from(secs) * NANOS_PER_SECOND + nanos;
        let micros = total_nanos.div_euclid(NANOS_PER_MICRO);
        let micros = i64::try_from(micros).ok()?;
        Some(Self { micros })
    }

    /// Returns microseconds since the Unix epoch.
    pub fn as_unix_micros(&self) -> i64 {
        self.micros
    }

    /// Returns the canonical microsecond value of an optional timestamp.
    pub fn micros_or_unset(ts: Option<Timestamp>) -> i64 {
        ts.map_or(UNSET_MICROS, |t| t.micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_secs() {
        let ts = Timestamp::from_unix_secs(1_700_000_000);
        assert_eq!(ts.as_unix_micros(), 1_700_000_000_000_000);
    }

    #[test]
    fn test_from_unix_secs_saturates() {
        let ts = Timestamp::from_unix_secs(i64::MAX);
        assert_eq!(ts.as_unix_micros(), i64::MAX);
    }

    #[test]
    fn test_parse_pax_whole_seconds() {
        let ts = Timestamp::parse_pax(b"1234").unwrap();
        assert_eq!(ts.as_unix_micros(), 1_234_000_000);
    }

    #[test]
    fn test_parse_pax_truncates_below_micros() {
        let ts = Timestamp::parse_pax(b"1.0000019").unwrap();
        assert_eq!(ts.as_unix_micros(), 1_000_001);

        let ts = Timestamp::parse_pax(b"1.12345678912345").unwrap();
        assert_eq!(ts.as_unix_micros(), 1_123_456);
    }

    #[test]
    fn test_parse_pax_negative_rounds_down() {
        let ts = Timestamp::parse_pax(b"-1.0000001").unwrap();
        assert_eq!(ts.as_unix_micros(), -1_000_001);

        let ts = Timestamp::parse_pax(b"-0.5").unwrap();
        assert_eq!(ts.as_unix_micros(), -500_000);
    }

    #[test]
    fn test_parse_pax_rejects_garbage() {
        assert!(Timestamp::parse_pax(b"").is_none());
        assert!(Timestamp::parse_pax(b"12a").is_none());
        assert!(Timestamp::parse_pax(b"1.2.3").is_none());
        assert!(Timestamp::parse_pax(b"1.-2").is_none());
        assert!(Timestamp::parse_pax(&[0xFF, b'1']).is_none());
    }

    #[test]
    fn test_unset_sentinel() {
        assert_eq!(Timestamp::micros_or_unset(None), UNSET_MICROS);
        assert_eq!(
            Timestamp::micros_or_unset(Some(Timestamp::from_unix_micros(5))),
            5
        );
    }
}
