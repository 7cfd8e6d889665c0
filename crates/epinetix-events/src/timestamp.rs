//! Tolerant timestamp parsing for rows written by the outer content server.
//!
//! Timestamps arrive in more than one string format depending on which
//! writer produced the row. Unparseable values are the caller's problem to
//! log and drop, not this module's to fail loudly over.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp as RFC 3339 first, then `"YYYY-MM-DD HH:MM:SS"` (assumed UTC).
/// Returns `None` if neither format matches.
#[must_use]
pub fn parse_tolerant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_tolerant("2026-07-31T09:15:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-07-31T09:15:00+00:00");
    }

    #[test]
    fn parses_naive_space_separated() {
        let parsed = parse_tolerant("2026-07-31 09:15:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-07-31T09:15:00+00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_tolerant("not-a-timestamp").is_none());
        assert!(parse_tolerant("").is_none());
    }
}
