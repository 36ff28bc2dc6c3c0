//! Time utility functions
//!
//! ClickHouse renders `Date`, `DateTime` and `DateTime64` values in its text
//! formats as `YYYY-MM-DD`, `YYYY-MM-DD hh:mm:ss` and
//! `YYYY-MM-DD hh:mm:ss.fff...` respectively.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat};

/// Fixed output format for temporal values in generic records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Output format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a ClickHouse-rendered date or datetime into a naive timestamp.
///
/// Dates resolve to midnight. Fractional seconds are accepted. Returns `None`
/// for anything that is not one of the three ClickHouse text layouts.
pub fn parse_clickhouse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Format as `YYYY-MM-DDTHH:MM:SS` (no zone, no fractional seconds)
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Format as `YYYY-MM-DD`
pub fn format_date(dt: &NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// Format as RFC 3339 with a `Z` suffix, second precision.
///
/// `dt` must already be a UTC wall-clock time; the store session renders
/// datetimes in UTC.
pub fn format_rfc3339_utc(dt: &NaiveDateTime) -> String {
    dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_is_midnight() {
        let dt = parse_clickhouse_datetime("2024-01-31").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 31);
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_clickhouse_datetime("2024-01-01 10:00:00").unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-01T10:00:00");
    }

    #[test]
    fn test_parse_datetime64_drops_fraction_on_format() {
        let dt = parse_clickhouse_datetime("2024-01-01 10:00:00.123").unwrap();
        assert_eq!(dt.nanosecond(), 123_000_000);
        assert_eq!(format_timestamp(&dt), "2024-01-01T10:00:00");
    }

    #[test]
    fn test_parse_iso_separator() {
        let dt = parse_clickhouse_datetime("2024-03-05T07:08:09").unwrap();
        assert_eq!(format_timestamp(&dt), "2024-03-05T07:08:09");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_clickhouse_datetime("").is_none());
        assert!(parse_clickhouse_datetime("yesterday").is_none());
        assert!(parse_clickhouse_datetime("2024-13-01").is_none());
    }

    #[test]
    fn test_format_date_and_rfc3339() {
        let dt = parse_clickhouse_datetime("2024-01-01 10:00:00").unwrap();
        assert_eq!(format_date(&dt), "2024-01-01");
        assert_eq!(format_rfc3339_utc(&dt), "2024-01-01T10:00:00Z");
    }
}
