//! Date handling for admissions, billing windows and payer fields.
//!
//! Billing windows are counted in whole calendar days from a start date, both
//! ends inclusive. "Today" is always resolved in the clinic's UTC offset before
//! any window arithmetic happens.

use chrono::format::ParseErrorKind;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("Invalid date format: {0}")]
    InvalidFormat(String),
    #[error("Invalid date value: {0}")]
    InvalidDate(String),
    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),
}

/// Formats tried, in order, by [`parse_flexible_date`]. Day-first for
/// slashed dates, as the payer writes them.
const FLEXIBLE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
];

/// Strict ISO `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| match e.kind() {
        ParseErrorKind::OutOfRange => DateParseError::InvalidDate(input.to_string()),
        _ => DateParseError::InvalidFormat(input.to_string()),
    })
}

/// Parse the date spellings people actually type into a billing screen.
///
/// `reference` anchors the relative words (`today`, `yesterday`, `tomorrow`).
/// Timestamps keep the calendar date of their own offset.
pub fn parse_flexible_date(input: &str, reference: NaiveDate) -> Result<NaiveDate, DateParseError> {
    let trimmed = input.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return Ok(reference),
        "yesterday" => return Ok(add_days(reference, -1)),
        "tomorrow" => return Ok(add_days(reference, 1)),
        _ => {}
    }

    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return compact_date(trimmed);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    let mut out_of_range = false;
    for format in FLEXIBLE_FORMATS {
        match NaiveDate::parse_from_str(trimmed, format) {
            Ok(date) => return Ok(date),
            Err(e) if e.kind() == ParseErrorKind::OutOfRange => out_of_range = true,
            Err(_) => {}
        }
    }

    if out_of_range {
        Err(DateParseError::InvalidDate(input.to_string()))
    } else {
        Err(DateParseError::InvalidFormat(input.to_string()))
    }
}

fn compact_date(digits: &str) -> Result<NaiveDate, DateParseError> {
    let part = |range: std::ops::Range<usize>| -> Result<u32, DateParseError> {
        digits[range]
            .parse()
            .map_err(|_| DateParseError::InvalidFormat(digits.to_string()))
    };
    let year = part(0..4)? as i32;
    NaiveDate::from_ymd_opt(year, part(4..6)?, part(6..8)?)
        .ok_or_else(|| DateParseError::InvalidDate(digits.to_string()))
}

/// RFC 3339 timestamp to the calendar date it falls on in `offset`.
pub fn parse_zoned_date(input: &str, offset: FixedOffset) -> Result<NaiveDate, DateParseError> {
    let ts = DateTime::parse_from_rfc3339(input.trim())
        .map_err(|_| DateParseError::InvalidFormat(input.to_string()))?;
    Ok(ts.with_timezone(&offset).date_naive())
}

/// Accepts `Z`, `UTC`, whole hours (`-6`) and `+HH:MM` forms.
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, DateParseError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }
    let invalid = || DateParseError::InvalidOffset(input.to_string());

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Local midnight of `date` in `offset`, as a UTC instant.
pub fn local_date_to_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc = local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// The calendar date of `now` for a clinic in `offset`.
pub fn today_in(offset: FixedOffset, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + TimeDelta::days(days)
}

/// Signed whole days from `start` to `end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Inclusive range of billing days. `end == None` never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DayWindow {
    /// Window covering `day_range` days from `start`. A missing day range is
    /// open-ended; zero is treated as a single day.
    pub fn from_range(start: NaiveDate, day_range: Option<i64>) -> Self {
        let end = day_range.map(|days| add_days(start, days.max(1) - 1));
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }

    pub fn is_past(&self, date: NaiveDate) -> bool {
        self.end.is_some_and(|end| date > end)
    }

    /// First day after the window, if it closes.
    pub fn next_start(&self) -> Option<NaiveDate> {
        self.end.map(|end| add_days(end, 1))
    }

    /// The earlier of `requested` and the window end.
    pub fn clamp_end(&self, requested: NaiveDate) -> NaiveDate {
        match self.end {
            Some(end) => requested.min(end),
            None => requested,
        }
    }
}

/// `DDMMYY`, the payer's date of service layout.
pub fn format_ddmmyy(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// `MMYY`, used for birth dates.
pub fn format_mmyy(date: NaiveDate) -> String {
    date.format("%m%y").to_string()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("2024-01-05")]
    #[case("2024/01/05")]
    #[case("20240105")]
    #[case("05/01/2024")]
    #[case("Jan 5, 2024")]
    #[case("January 5 2024")]
    #[case("5 Jan 2024")]
    #[case("05-Jan-2024")]
    #[case("2024-01-05T23:30:00-06:00")]
    #[case("  2024-01-05 ")]
    fn test_flexible_formats(#[case] input: &str) {
        assert_eq!(parse_flexible_date(input, ymd(2000, 1, 1)).unwrap(), ymd(2024, 1, 5));
    }

    #[test]
    fn test_relative_words() {
        let reference = ymd(2024, 3, 1);
        assert_eq!(parse_flexible_date("today", reference).unwrap(), reference);
        assert_eq!(parse_flexible_date("Yesterday", reference).unwrap(), ymd(2024, 2, 29));
        assert_eq!(parse_flexible_date("TOMORROW", reference).unwrap(), ymd(2024, 3, 2));
    }

    #[test]
    fn test_rejects_garbage_and_impossible_dates() {
        let reference = ymd(2024, 1, 1);
        assert!(matches!(
            parse_flexible_date("next tuesday", reference),
            Err(DateParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_flexible_date("20240230", reference),
            Err(DateParseError::InvalidDate(_))
        ));
        assert!(parse_flexible_date("2024-02-30", reference).is_err());
        assert!(parse_date("05/01/2024").is_err());
    }

    #[test]
    fn test_zoned_date_crosses_midnight() {
        let regina = parse_utc_offset("-6").unwrap();
        assert_eq!(parse_zoned_date("2024-01-05T03:00:00Z", regina).unwrap(), ymd(2024, 1, 4));
        assert_eq!(parse_zoned_date("2024-01-05T03:00:00Z", utc_offset()).unwrap(), ymd(2024, 1, 5));
    }

    #[test]
    fn test_offsets() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_utc_offset("-03:30").unwrap().local_minus_utc(), -12_600);
        assert!(parse_utc_offset("+5:75").is_err());
        assert!(parse_utc_offset("east").is_err());
    }

    #[test]
    fn test_local_midnight_to_utc() {
        let regina = parse_utc_offset("-6").unwrap();
        let utc = local_date_to_utc(ymd(2024, 1, 5), regina);
        assert_eq!(utc.to_rfc3339(), "2024-01-05T06:00:00+00:00");
        assert_eq!(today_in(regina, utc), ymd(2024, 1, 5));
        assert_eq!(today_in(regina, utc - TimeDelta::seconds(1)), ymd(2024, 1, 4));
    }

    #[test]
    fn test_day_arithmetic() {
        assert_eq!(add_days(ymd(2024, 2, 28), 2), ymd(2024, 3, 1));
        assert_eq!(days_between(ymd(2024, 1, 1), ymd(2024, 1, 5)), 4);
        assert_eq!(days_between(ymd(2024, 1, 5), ymd(2024, 1, 1)), -4);
    }

    #[test]
    fn test_day_window() {
        let window = DayWindow::from_range(ymd(2024, 1, 4), Some(4));
        assert_eq!(window.end, Some(ymd(2024, 1, 7)));
        assert!(window.contains(ymd(2024, 1, 4)));
        assert!(window.contains(ymd(2024, 1, 7)));
        assert!(!window.contains(ymd(2024, 1, 8)));
        assert!(!window.contains(ymd(2024, 1, 3)));
        assert!(window.is_past(ymd(2024, 1, 8)));
        assert_eq!(window.next_start(), Some(ymd(2024, 1, 8)));
        assert_eq!(window.clamp_end(ymd(2024, 1, 30)), ymd(2024, 1, 7));
        assert_eq!(window.clamp_end(ymd(2024, 1, 5)), ymd(2024, 1, 5));

        let open = DayWindow::from_range(ymd(2024, 1, 4), None);
        assert!(open.contains(ymd(2030, 1, 1)));
        assert!(!open.is_past(ymd(2030, 1, 1)));
        assert_eq!(open.next_start(), None);
    }

    #[test]
    fn test_payer_formats() {
        assert_eq!(format_ddmmyy(ymd(2024, 1, 5)), "050124");
        assert_eq!(format_mmyy(ymd(1987, 11, 30)), "1187");
        assert_eq!(format_hhmm(NaiveTime::from_hms_opt(7, 5, 0).unwrap()), "0705");
    }
}
