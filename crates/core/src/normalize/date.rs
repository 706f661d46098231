//! Parsing of the date formats found in legacy transaction data.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::{NormalizeError, Result};

/// Two-digit years below this value belong to the 2000s, the rest to the 1900s.
pub const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// Excel serial numbers accepted as dates (1954-10-03 to 2119-01-09).
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<i64> = 20_000..=80_000;

/// The shape a date was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateFormat {
    /// `2024-05-21`, the canonical form.
    Iso,
    /// `2024-05-21T10:00:00Z` and friends.
    IsoDateTime,
    /// `21-May-25`, `21-ene-2025`.
    DayMonthName,
    /// `21/05/2025`.
    DayMonthYear,
    /// `21/05/25`.
    DayMonthShortYear,
    /// `May 21, 2025`.
    MonthNameDayYear,
    /// Days since 1899-12-30, as exported by spreadsheets.
    ExcelSerial,
}

impl DateFormat {
    pub fn label(&self) -> &'static str {
        match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::IsoDateTime => "ISO date-time",
            DateFormat::DayMonthName => "DD-MMM-YY",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::DayMonthShortYear => "DD/MM/YY",
            DateFormat::MonthNameDayYear => "MMM DD, YYYY",
            DateFormat::ExcelSerial => "Excel serial",
        }
    }
}

/// Parses a date stored as text or as an Excel serial number.
pub fn parse_date(value: &Value) -> Result<(NaiveDate, DateFormat)> {
    match value {
        Value::Null => Err(NormalizeError::MissingDate),
        Value::String(s) => parse_date_str(s),
        Value::Number(number) => number
            .as_f64()
            .and_then(|serial| excel_serial_to_date(serial.floor() as i64))
            .map(|date| (date, DateFormat::ExcelSerial))
            .ok_or_else(|| NormalizeError::InvalidDate(number.to_string())),
        other => Err(NormalizeError::InvalidDate(other.to_string())),
    }
}

/// Parses a date from text; see [`DateFormat`] for the accepted shapes.
pub fn parse_date_str(raw: &str) -> Result<(NaiveDate, DateFormat)> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(NormalizeError::MissingDate);
    }

    let parsed = parse_iso(s)
        .or_else(|| parse_iso_datetime(s))
        .or_else(|| parse_day_month_name(s))
        .or_else(|| parse_slashed(s))
        .or_else(|| parse_month_name_day_year(s))
        .or_else(|| parse_excel_serial_text(s));

    parsed.ok_or_else(|| NormalizeError::InvalidDate(raw.to_string()))
}

/// Converts an Excel serial day number to a date.
pub fn excel_serial_to_date(serial: i64) -> Option<NaiveDate> {
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial))
}

/// Month number for an English or Spanish month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.trim().to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" | "ene" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" | "abr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" | "ago" => 8,
        "sep" | "set" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" | "dic" => 12,
        _ => return None,
    };
    Some(month)
}

fn expand_year(year: i32, digits: usize) -> i32 {
    if digits > 2 {
        year
    } else if year < TWO_DIGIT_YEAR_PIVOT {
        2000 + year
    } else {
        1900 + year
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if s.is_empty() || s.len() > 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(expand_year(s.parse().ok()?, s.len()))
}

fn parse_small(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_iso(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let mut parts = s.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(parse_year(year)?, parse_small(month)?, parse_small(day)?)?;
    Some((date, DateFormat::Iso))
}

fn parse_iso_datetime(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let date = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })?;
    Some((date, DateFormat::IsoDateTime))
}

fn parse_day_month_name(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let mut parts = s.split(['-', ' ']).filter(|p| !p.is_empty());
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !month.chars().all(char::is_alphabetic) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(parse_year(year)?, month_from_name(month)?, parse_small(day)?)?;
    Some((date, DateFormat::DayMonthName))
}

fn parse_slashed(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let mut parts = s.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let format = match year.len() {
        4 => DateFormat::DayMonthYear,
        2 => DateFormat::DayMonthShortYear,
        _ => return None,
    };
    let date = NaiveDate::from_ymd_opt(parse_year(year)?, parse_small(month)?, parse_small(day)?)?;
    Some((date, format))
}

fn parse_month_name_day_year(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let cleaned = s.replace(',', " ");
    let mut parts = cleaned.split_whitespace();
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !month.chars().all(char::is_alphabetic) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(parse_year(year)?, month_from_name(month)?, parse_small(day)?)?;
    Some((date, DateFormat::MonthNameDayYear))
}

fn parse_excel_serial_text(s: &str) -> Option<(NaiveDate, DateFormat)> {
    let serial: f64 = s.parse().ok()?;
    let date = excel_serial_to_date(serial.floor() as i64)?;
    Some((date, DateFormat::ExcelSerial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(s: &str) -> (NaiveDate, DateFormat) {
        parse_date_str(s).unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse("2025-05-21"), (ymd(2025, 5, 21), DateFormat::Iso));
    }

    #[test]
    fn test_iso_datetime_uses_utc_date() {
        assert_eq!(
            parse("2025-05-21T23:30:00-03:00"),
            (ymd(2025, 5, 22), DateFormat::IsoDateTime)
        );
        assert_eq!(
            parse("2025-05-21T10:00:00.000Z"),
            (ymd(2025, 5, 21), DateFormat::IsoDateTime)
        );
        assert_eq!(
            parse("2025-05-21 08:15:00"),
            (ymd(2025, 5, 21), DateFormat::IsoDateTime)
        );
    }

    #[test]
    fn test_day_month_name_english_and_spanish() {
        assert_eq!(parse("21-May-25"), (ymd(2025, 5, 21), DateFormat::DayMonthName));
        assert_eq!(parse("3-Ene-24"), (ymd(2024, 1, 3), DateFormat::DayMonthName));
        assert_eq!(parse("15-abr-2023"), (ymd(2023, 4, 15), DateFormat::DayMonthName));
        assert_eq!(parse("1-AGO-99"), (ymd(1999, 8, 1), DateFormat::DayMonthName));
        assert_eq!(parse("24-Dic-49"), (ymd(2049, 12, 24), DateFormat::DayMonthName));
    }

    #[test]
    fn test_slashed_dates_are_day_first() {
        assert_eq!(parse("05/04/2024"), (ymd(2024, 4, 5), DateFormat::DayMonthYear));
        assert_eq!(parse("5/4/24"), (ymd(2024, 4, 5), DateFormat::DayMonthShortYear));
        assert_eq!(parse("31/12/75"), (ymd(1975, 12, 31), DateFormat::DayMonthShortYear));
    }

    #[test]
    fn test_month_name_day_year() {
        assert_eq!(
            parse("March 7, 2024"),
            (ymd(2024, 3, 7), DateFormat::MonthNameDayYear)
        );
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(
            parse_date(&json!(45432)).unwrap(),
            (ymd(2024, 5, 20), DateFormat::ExcelSerial)
        );
        assert_eq!(parse("45432"), (ymd(2024, 5, 20), DateFormat::ExcelSerial));
        assert!(parse_date(&json!(12)).is_err());
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(
            parse_date_str("31/31/2024"),
            Err(NormalizeError::InvalidDate("31/31/2024".to_string()))
        );
        assert!(parse_date_str("2024-02-30").is_err());
        assert!(parse_date_str("yesterday").is_err());
        assert!(parse_date_str("21-Foo-25").is_err());
        assert_eq!(parse_date_str("  "), Err(NormalizeError::MissingDate));
        assert_eq!(parse_date(&json!(null)), Err(NormalizeError::MissingDate));
    }

    #[test]
    fn test_month_from_name() {
        assert_eq!(month_from_name("septiembre"), Some(9));
        assert_eq!(month_from_name("Set"), Some(9));
        assert_eq!(month_from_name("December"), Some(12));
        assert_eq!(month_from_name("xx"), None);
    }
}
