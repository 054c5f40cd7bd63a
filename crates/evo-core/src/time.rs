//! ISO-8601 timestamp parsing
//!
//! Accepts RFC 3339 (`2025-01-01T10:00:00Z`, `...+02:00`), the same with a
//! space separator, zone-less date-times and bare dates. Zone-less values
//! cannot be placed on the UTC timeline, so they never count as "future".

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A parsed timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Carries a UTC offset
    Zoned(DateTime<FixedOffset>),
    /// No offset information
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Parse an ISO-8601 string
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(Self::Zoned(dt));
        }
        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(text, format) {
                return Some(Self::Zoned(dt));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Self::Naive(dt));
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }

    /// Whether the timestamp lies beyond `now + skew`
    #[must_use]
    pub fn is_future(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self {
            Self::Zoned(dt) => dt.with_timezone(&Utc) > now + skew,
            Self::Naive(_) => false,
        }
    }
}

/// Whether `text` is a valid ISO-8601 timestamp
#[inline]
#[must_use]
pub fn is_iso8601(text: &str) -> bool {
    Timestamp::parse(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_forms() {
        assert!(matches!(Timestamp::parse("2025-01-01T10:00:00Z"), Some(Timestamp::Zoned(_))));
        assert!(matches!(
            Timestamp::parse("2025-01-01T10:00:00.123+02:00"),
            Some(Timestamp::Zoned(_))
        ));
        assert!(matches!(
            Timestamp::parse("2025-01-01 10:00:00+00:00"),
            Some(Timestamp::Zoned(_))
        ));
        assert!(matches!(Timestamp::parse("2025-01-01T10:00:00"), Some(Timestamp::Naive(_))));
        assert!(matches!(Timestamp::parse("2025-01-01"), Some(Timestamp::Naive(_))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(!is_iso8601("yesterday"));
        assert!(!is_iso8601("2025-13-01T00:00:00Z"));
        assert!(!is_iso8601(""));
    }

    #[test]
    fn future_detection_respects_skew() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let ts = Timestamp::parse("2025-01-01T12:04:00Z").unwrap();
        assert!(!ts.is_future(now, Duration::seconds(300)));
        assert!(ts.is_future(now, Duration::seconds(60)));
    }

    #[test]
    fn naive_is_never_future() {
        let now = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let ts = Timestamp::parse("2099-01-01T00:00:00").unwrap();
        assert!(!ts.is_future(now, Duration::zero()));
    }
}
