use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::ShelfResult;

/// Formats a UTC timestamp as an ISO-8601 string with microsecond precision.
///
/// This is the canonical text form used everywhere a timestamp leaves the
/// process: per-record JSON files, document-store documents, and TEXT
/// columns in the relational backend. The fixed format keeps lexicographic
/// ordering chronological.
pub fn format_iso(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an ISO-8601 string back into a UTC timestamp.
pub fn parse_iso(text: &str) -> ShelfResult<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(text)?;
    Ok(parsed.with_timezone(&Utc))
}

/// Checks whether a string looks like an ISO-8601 timestamp.
///
/// Used when reviving stored documents, where only fields that parse cleanly
/// are converted back to timestamps.
pub fn looks_like_iso(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_parse_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 45).unwrap();
        let text = format_iso(&ts);
        let back = parse_iso(&text).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn test_formatted_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 45).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 11, 2, 8, 0, 0).unwrap();
        assert!(format_iso(&earlier) < format_iso(&later));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso("not a timestamp").is_err());
        assert!(parse_iso("2024-13-99").is_err());
    }

    #[test]
    fn test_looks_like_iso() {
        assert!(looks_like_iso("2024-03-15T10:30:45.000000Z"));
        assert!(looks_like_iso("2024-03-15T10:30:45+02:00"));
        assert!(!looks_like_iso("finished"));
        assert!(!looks_like_iso(""));
    }
}
