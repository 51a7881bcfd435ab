// ⏳ Date-Format Normalizer
// The partner export writes `<first>/<second>/<year> <time>` and does not say
// whether `first` is the day or the month. The uploader picks the convention.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReconError;

// ============================================================================
// DATE CONVENTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateConvention {
    /// 31/12/2024
    DayFirst,
    /// 12/31/2024
    MonthFirst,
}

impl Default for DateConvention {
    fn default() -> Self {
        DateConvention::DayFirst
    }
}

impl fmt::Display for DateConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateConvention::DayFirst => f.write_str("day-first"),
            DateConvention::MonthFirst => f.write_str("month-first"),
        }
    }
}

impl FromStr for DateConvention {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day-first" | "dayfirst" | "dmy" | "dd/mm/yyyy" => Ok(DateConvention::DayFirst),
            "month-first" | "monthfirst" | "mdy" | "mm/dd/yyyy" => Ok(DateConvention::MonthFirst),
            other => Err(ReconError::InvalidInput(format!(
                "unknown date convention: {} (expected day-first or month-first)",
                other
            ))),
        }
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Returned for any date that cannot be read: 1970-01-01T00:00:00
pub fn epoch_sentinel() -> NaiveDateTime {
    NaiveDateTime::default()
}

pub fn is_sentinel(value: &NaiveDateTime) -> bool {
    *value == epoch_sentinel()
}

const TIME_FORMATS: [&str; 5] = [
    "%H:%M:%S%.f",
    "%H:%M:%S",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
];

/// Parse `<first>/<second>/<year> <time>` under `convention`
///
/// Never fails: malformed input yields `epoch_sentinel()`.
pub fn parse_ambiguous_date(text: &str, convention: DateConvention) -> NaiveDateTime {
    parse_slash_date(text, convention).unwrap_or_else(epoch_sentinel)
}

fn parse_slash_date(text: &str, convention: DateConvention) -> Option<NaiveDateTime> {
    let (date_part, time_part) = text.trim().split_once(' ')?;
    let time_part = time_part.trim();
    if time_part.is_empty() {
        return None;
    }

    let mut parts = date_part.split('/');
    let first = parse_number(parts.next()?)?;
    let second = parse_number(parts.next()?)?;
    let year_text = parts.next()?;
    if parts.next().is_some() || year_text.len() != 4 {
        return None;
    }
    let year = i32::try_from(parse_number(year_text)?).ok()?;

    let (day, month) = match convention {
        DateConvention::DayFirst => (first, second),
        DateConvention::MonthFirst => (second, first),
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time_part, format).ok())?;

    Some(date.and_time(time))
}

fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse the event date of a row, whichever ledger produced it
///
/// ISO forms (as served by the local ledger store) are tried first, then the
/// ambiguous slash form. `None` when nothing fits.
pub fn parse_row_date(text: &str, convention: DateConvention) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    let parsed = parse_ambiguous_date(trimmed, convention);
    if is_sentinel(&parsed) {
        None
    } else {
        Some(parsed)
    }
}
