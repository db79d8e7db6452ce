//! Parsing and formatting the `YYYY-MM-DDTHH:mm:ss.d` timestamp
//! strings used at the HTTP boundary.
//!
//! Grounded on `examples/original_source/cmd/api/utils/time.go`.
//! Parsing is lenient by prefix length (date-only, date+time, or
//! date+time+decisecond); formatting always emits the full form.

use std::sync::LazyLock;

use chrono::{TimeZone, Utc};
use regex::Regex;

use crate::error::CacheError;

static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}-(0\d|1[0-2])-(0[1-9]|[1-3]\d)(T(0\d|[1-2][0-4]):(0\d|[1-5]\d):(0\d|[1-5]\d))?(\.\d)?",
    )
    .expect("static timestamp regex is valid")
});

/// Parses a timestamp string into Unix milliseconds. At least the
/// `YYYY-MM-DD` prefix (10 bytes) must be present; `THH:mm:ss` (19)
/// and `.d` (21, a single decisecond digit) extend the precision.
/// Fields past what's present in `s` default to the start of the
/// range (month/day 1, all clock fields 0).
pub fn parse_datetime_string(s: &str) -> Result<i64, CacheError> {
    if !TIMESTAMP_PATTERN.is_match(s) {
        return Err(CacheError::Validation(format!(
            "invalid time format {s:?}: expected YYYY-MM-DDTHH:mm:ss.d, YYYY-MM-DDTHH:mm:ss, or YYYY-MM-DD"
        )));
    }

    let bytes = s.as_bytes();
    let n = bytes.len();
    let field = |range: std::ops::Range<usize>| -> Result<u32, CacheError> {
        s.get(range.clone())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| CacheError::Validation(format!("malformed timestamp field in {s:?}")))
    };

    let (mut year, mut month, mut day) = (1970i32, 1u32, 1u32);
    if n >= 10 {
        year = field(0..4)? as i32;
        month = field(5..7)?;
        day = field(8..10)?;
    }

    let (mut hour, mut minute, mut second) = (0u32, 0u32, 0u32);
    if n >= 19 {
        hour = field(11..13)?;
        minute = field(14..16)?;
        second = field(17..19)?;
    }

    let mut milli = 0u32;
    if n >= 21 {
        let deci: u32 = s[20..21]
            .parse()
            .map_err(|_| CacheError::Validation(format!("malformed decisecond digit in {s:?}")))?;
        milli = deci * 100;
    }

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .and_then(|dt| dt.checked_add_signed(chrono::Duration::milliseconds(milli as i64)))
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| CacheError::Validation(format!("time {s:?} does not name a valid calendar date")))
}

/// Formats Unix milliseconds as `YYYY-MM-DDTHH:mm:ss.d`, truncating
/// sub-decisecond precision (mirrors the source's error-message
/// formatting, reused here for both errors and any future full-
/// precision display needs).
pub fn format_unix_milli(t: i64) -> String {
    let dt = Utc.timestamp_millis_opt(t).single().unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap());
    let deciseconds = dt.timestamp_subsec_millis() / 100;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{}",
        dt.format("%Y"),
        dt.format("%m"),
        dt.format("%d"),
        dt.format("%H"),
        dt.format("%M"),
        dt.format("%S"),
        deciseconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_only() {
        let t = parse_datetime_string("2024-01-02").unwrap();
        assert_eq!(format_unix_milli(t), "2024-01-02T00:00:00.0");
    }

    #[test]
    fn parses_full_datetime_with_decisecond() {
        let t = parse_datetime_string("2024-01-02T03:04:05.7").unwrap();
        assert_eq!(format_unix_milli(t), "2024-01-02T03:04:05.7");
    }

    #[test]
    fn parses_datetime_without_decisecond() {
        let t = parse_datetime_string("2024-01-02T03:04:05").unwrap();
        assert_eq!(format_unix_milli(t), "2024-01-02T03:04:05.0");
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_datetime_string("not-a-date").is_err());
    }

    #[test]
    fn round_trips_through_format() {
        let original = "2023-06-15T12:30:45.5";
        let t = parse_datetime_string(original).unwrap();
        assert_eq!(format_unix_milli(t), original);
    }
}
