//! Datetime parsing shared by the detector and the datetime analyzer.

use chrono::{NaiveDate, NaiveDateTime};

/// Accepted year range. Parses landing outside are treated as non-dates.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// Datetime formats tried in order (ISO first, then US, then EU).
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only formats tried after the datetime formats.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Parse a raw value as a timestamp within the sane year range.
///
/// Tries RFC 3339, then the fixed datetime formats, then date-only formats
/// (midnight). Ambiguous day/month orderings resolve US-first by list order.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    parse_datetime_lenient(raw).and_then(in_year_range)
}

/// Parse without the year-range check. The datetime analyzer uses this to
/// count out-of-range years for its validity notes.
pub fn parse_datetime_lenient(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn in_year_range(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    use chrono::Datelike;
    let year = dt.year();
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_common_formats() {
        for raw in [
            "2023-06-15",
            "2023/06/15",
            "06/15/2023",
            "15.06.2023",
            "2023-06-15 10:30:00",
            "2023-06-15T10:30:00",
            "2023-06-15T10:30:00Z",
        ] {
            let dt = parse_datetime(raw).unwrap_or_else(|| panic!("failed to parse {raw}"));
            assert_eq!(dt.year(), 2023);
            assert_eq!(dt.month(), 6);
        }
    }

    #[test]
    fn ambiguous_dates_resolve_us_first() {
        let dt = parse_datetime("03/04/2020").unwrap();
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.day(), 4);
    }

    #[test]
    fn rejects_out_of_range_years() {
        assert!(parse_datetime("1776-07-04").is_none());
        assert!(parse_datetime("2200-01-01").is_none());
        assert!(parse_datetime("1900-01-01").is_some());
        assert!(parse_datetime("2100-12-31").is_some());
    }

    #[test]
    fn rejects_non_dates() {
        assert!(parse_datetime("hello").is_none());
        assert!(parse_datetime("42.5").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn keeps_time_of_day() {
        let dt = parse_datetime("2023-01-02 03:04:05").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (3, 4, 5));
    }
}
