//! Publish/update date parsing.
//!
//! Front matter carries dates in whatever shape the blog author typed:
//! numeric epochs, `YYYY-MM-DD hh:mm:ss`, slashes instead of dashes, `T`
//! separators, `Z` or `±HHMM`/`±HH:MM` offsets, arbitrary fractional-second
//! precision. Everything resolves to a timezone-aware timestamp; naive
//! values are interpreted in the local timezone and unparsable values fall
//! back to the caller-provided time (run start).

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

static RE_COMPACT_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{2})(\d{2})$").unwrap());
static RE_FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.(\d{7,})").unwrap());

/// Formats carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Naive formats resolved in the local timezone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a front-matter date value, falling back when absent or unparsable.
pub fn parse_date_value(value: Option<&Value>, fallback: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    match value {
        Some(Value::Number(n)) => {
            let secs = n.as_f64().unwrap_or_default();
            epoch_to_datetime(secs).unwrap_or(fallback)
        }
        Some(Value::String(s)) => parse_date_str(s).unwrap_or(fallback),
        _ => fallback,
    }
}

/// Parse a date string in any of the accepted shapes.
pub fn parse_date_str(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let normalized = normalize_date_text(text);
    for candidate in [normalized.clone(), normalized.replace('/', "-")] {
        if let Some(parsed) = parse_candidate(&candidate) {
            return Some(parsed);
        }
    }
    None
}

/// Unix timestamp of a timezone-aware datetime.
pub fn to_unix_timestamp(date: DateTime<FixedOffset>) -> i64 {
    date.timestamp()
}

/// Normalize `Z` suffix, compact `±HHMM` offsets and over-long fractions.
fn normalize_date_text(text: &str) -> String {
    let mut text = text.to_owned();
    if let Some(stripped) = text.strip_suffix('Z') {
        text = format!("{stripped}+00:00");
    }
    text = RE_COMPACT_OFFSET.replace(&text, "$1:$2").into_owned();
    // Truncate fractional seconds to microsecond precision.
    if let Some(digits) = RE_FRACTION.captures(&text).and_then(|caps| caps.get(1)) {
        let truncated = format!(
            "{}.{}{}",
            &text[..digits.start() - 1],
            &digits.as_str()[..6],
            &text[digits.end()..]
        );
        text = truncated;
    }
    text
}

fn parse_candidate(text: &str) -> Option<DateTime<FixedOffset>> {
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return local_datetime(parsed);
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return local_datetime(parsed.and_hms_opt(0, 0, 0)?);
    }
    None
}

/// Resolve a naive datetime in the local timezone.
fn local_datetime(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

/// Convert a numeric epoch (seconds, possibly fractional) to a datetime.
fn epoch_to_datetime(secs: f64) -> Option<DateTime<FixedOffset>> {
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract().abs() * 1_000_000_000.0) as u32;
    Local
        .timestamp_opt(whole, nanos)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_plain_datetime() {
        let dt = parse_date_str("2023-06-15 14:30:45").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 6, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (14, 30, 45));
    }

    #[test]
    fn test_parse_t_separator_and_z_suffix() {
        let dt = parse_date_str("2023-06-15T14:30:45Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn test_parse_compact_offset() {
        let compact = parse_date_str("2023-06-15 14:30:45+0800").unwrap();
        let colon = parse_date_str("2023-06-15 14:30:45+08:00").unwrap();
        assert_eq!(compact, colon);
        assert_eq!(compact.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_parse_slash_separators() {
        let dt = parse_date_str("2023/06/15 14:30").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 6, 15));
        assert_eq!((dt.hour(), dt.minute()), (14, 30));

        let date_only = parse_date_str("2023/06/15").unwrap();
        assert_eq!(date_only.day(), 15);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_date_str("2023-06-15").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }

    #[test]
    fn test_fraction_truncated_to_micros() {
        let dt = parse_date_str("2023-06-15T14:30:45.123456789Z").unwrap();
        assert_eq!(dt.timestamp_subsec_micros(), 123_456);

        let with_offset = parse_date_str("2023-06-15T14:30:45.9876543210+08:00").unwrap();
        assert_eq!(with_offset.timestamp_subsec_micros(), 987_654);
    }

    #[test]
    fn test_unparsable_returns_none() {
        assert!(parse_date_str("").is_none());
        assert!(parse_date_str("next tuesday").is_none());
        assert!(parse_date_str("2023-13-45").is_none());
    }

    #[test]
    fn test_parse_date_value_fallback() {
        let fallback = parse_date_str("2020-01-01 00:00:00").unwrap();
        assert_eq!(parse_date_value(None, fallback), fallback);
        assert_eq!(
            parse_date_value(Some(&Value::String("garbage".into())), fallback),
            fallback
        );
        assert_eq!(parse_date_value(Some(&Value::Null), fallback), fallback);
    }

    #[test]
    fn test_parse_date_value_epoch() {
        let fallback = parse_date_str("2020-01-01 00:00:00").unwrap();
        let dt = parse_date_value(Some(&Value::from(1_686_839_445i64)), fallback);
        assert_eq!(to_unix_timestamp(dt), 1_686_839_445);
    }

    #[test]
    fn test_to_unix_timestamp_respects_offset() {
        let east = parse_date_str("2023-06-15 12:00:00+08:00").unwrap();
        let utc = parse_date_str("2023-06-15 04:00:00Z").unwrap();
        assert_eq!(to_unix_timestamp(east), to_unix_timestamp(utc));
    }
}
