use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{InsightError, Result};

// ── Date parsing ──────────────────────────────────────────────────────────────

/// Date-only layouts tried in order.  Month-first wins for ambiguous
/// slash-separated dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Date-time layouts whose time part is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a raw ledger date into a calendar date.
///
/// Accepts RFC 3339 timestamps (the date is taken in the timestamp's own
/// offset), ISO-8601 dates and date-times, and the common locale layouts in
/// [`DATE_FORMATS`].  Returns [`InsightError::TypeCoercion`] otherwise.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    Err(InsightError::TypeCoercion {
        value: raw.to_string(),
        expected: "date",
    })
}

// ── Month names ───────────────────────────────────────────────────────────────

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    let idx = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(idx).copied()
}

/// Like [`month_name`] but falls back to `"Invalid Month"`.
pub fn month_name_or_invalid(month: u32) -> &'static str {
    month_name(month).unwrap_or("Invalid Month")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_date("2023-01-15").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("  2023-01-15 ").unwrap(), ymd(2023, 1, 15));
    }

    #[test]
    fn test_parse_datetime_drops_time() {
        assert_eq!(parse_date("2023-01-15 13:45:00").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("2023-01-15T23:59:59").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("2023-01-15 08:30").unwrap(), ymd(2023, 1, 15));
    }

    #[test]
    fn test_parse_rfc3339_keeps_local_date() {
        assert_eq!(
            parse_date("2023-01-15T23:30:00-05:00").unwrap(),
            ymd(2023, 1, 15)
        );
        assert_eq!(parse_date("2023-01-15T10:00:00Z").unwrap(), ymd(2023, 1, 15));
    }

    #[test]
    fn test_parse_locale_layouts() {
        assert_eq!(parse_date("01/15/2023").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("2023/01/15").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("15.01.2023").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("Jan 15, 2023").unwrap(), ymd(2023, 1, 15));
        assert_eq!(parse_date("15 January 2023").unwrap(), ymd(2023, 1, 15));
    }

    #[test]
    fn test_parse_ambiguous_slash_is_month_first() {
        assert_eq!(parse_date("02/03/2023").unwrap(), ymd(2023, 2, 3));
    }

    #[test]
    fn test_parse_invalid_date_is_type_error() {
        for raw in ["", "someday", "2023-02-30", "13/45/2023"] {
            let err = parse_date(raw).unwrap_err();
            assert!(
                matches!(err, InsightError::TypeCoercion { expected: "date", .. }),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
        assert_eq!(month_name_or_invalid(13), "Invalid Month");
    }
}
