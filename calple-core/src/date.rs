//! Calendar dates, spans, and viewport months.
//!
//! Event dates are civil days encoded as compact `YYYYMMDD` strings in the
//! store, which keeps them filterable with the store's lexicographic range
//! queries. Viewports are `YYYYMM` tokens naming the month a calendar query
//! is scoped to.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CalpleError, CalpleResult};

/// A civil calendar day, stored as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalDate(NaiveDate);

impl CalDate {
    pub fn parse(s: &str) -> CalpleResult<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CalpleError::Validation(format!(
                "Invalid date '{s}'. Use YYYYMMDD"
            )));
        }
        let date = NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| {
            CalpleError::Validation(format!("Invalid date values in '{s}'"))
        })?;
        Ok(CalDate(date))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CalDate)
    }

    /// Compact `YYYYMMDD` form, as persisted.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }
}

impl fmt::Display for CalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

impl Serialize for CalDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.compact())
    }
}

impl<'de> Deserialize<'de> for CalDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CalDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Closed inclusive span of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySpan {
    pub start: CalDate,
    pub end: CalDate,
}

impl DaySpan {
    pub fn new(start: CalDate, end: CalDate) -> Self {
        DaySpan { start, end }
    }

    /// Closed-interval overlap: neither span ends before the other begins.
    pub fn overlaps(&self, other: &DaySpan) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// The year and month a calendar query is scoped to (`YYYYMM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    year: i32,
    month: u32,
}

impl Viewport {
    pub fn parse(s: &str) -> CalpleResult<Self> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CalpleError::Validation(
                "Invalid view date format. Use YYYYMM".into(),
            ));
        }
        // Unwraps are safe: six ASCII digits split into four and two.
        let year: i32 = s[0..4].parse().unwrap();
        let month: u32 = s[4..6].parse().unwrap();
        if !(1..=12).contains(&month) {
            return Err(CalpleError::Validation(format!(
                "Invalid month in view date '{s}'"
            )));
        }
        Ok(Viewport { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> CalDate {
        // Safe: month is validated at parse time.
        CalDate::from_ymd(self.year, self.month, 1).unwrap()
    }

    pub fn last_day(&self) -> CalDate {
        let next_month = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        // Safe: both the next month and its predecessor always exist.
        CalDate(next_month.unwrap().pred_opt().unwrap())
    }

    /// The month's full day range.
    pub fn span(&self) -> DaySpan {
        DaySpan::new(self.first_day(), self.last_day())
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}
