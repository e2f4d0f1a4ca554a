//! Date handling for daily products.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Format a date as the `YYYYMMDD` key used in product filenames.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_date_key(s: &str) -> CommonResult<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| CommonError::InvalidDate(s.to_string()))
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CommonResult<Self> {
        if start > end {
            return Err(CommonError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// January 1st through December 31st of `year`, cut at `today`.
    ///
    /// Returns `None` when the whole year lies after `today`.
    pub fn for_year(year: i32, today: NaiveDate) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Self { start, end }.clamp_to(today)
    }

    /// Cut the end of the range at `today`; `None` if nothing is left.
    pub fn clamp_to(&self, today: NaiveDate) -> Option<Self> {
        if self.start > today {
            return None;
        }
        Some(Self {
            start: self.start,
            end: self.end.min(today),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days in the range; zero when `start` is after `end`.
    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }

    /// Every day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Year of the first day.
    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_key_roundtrip() {
        assert_eq!(date_key(d(2021, 1, 5)), "20210105");
        assert_eq!(parse_date_key("20210105").unwrap(), d(2021, 1, 5));
        assert_eq!(parse_date_key("2021-01-05").unwrap(), d(2021, 1, 5));
    }

    #[test]
    fn test_parse_rejects_impossible_dates() {
        assert!(parse_date_key("20210230").is_err());
        assert!(parse_date_key("2021-13-01").is_err());
        assert!(parse_date_key("yesterday").is_err());
    }

    #[test]
    fn test_range_rejects_inverted() {
        assert!(DateRange::new(d(2021, 1, 3), d(2021, 1, 1)).is_err());
    }

    #[test]
    fn test_inverted_literal_range_is_empty() {
        let range = DateRange {
            start: d(2021, 1, 3),
            end: d(2021, 1, 1),
        };
        assert_eq!(range.len(), 0);
        assert_eq!(range.days().count(), 0);
    }

    #[test]
    fn test_days() {
        let range = DateRange::new(d(2021, 12, 30), d(2022, 1, 2)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(range.len(), 4);
        assert_eq!(days[0], d(2021, 12, 30));
        assert_eq!(days[3], d(2022, 1, 2));
    }

    #[test]
    fn test_for_year_clamps_to_today() {
        let today = d(2024, 3, 10);

        let past = DateRange::for_year(2023, today).unwrap();
        assert_eq!(past.len(), 365);

        let current = DateRange::for_year(2024, today).unwrap();
        assert_eq!(current.end, today);
        assert_eq!(current.len(), 31 + 29 + 10);

        assert!(DateRange::for_year(2025, today).is_none());
    }
}
