//! Fiscal calendar types
//!
//! Fiscal periods are company-scoped, contiguous, non-overlapping year-long
//! windows numbered from 1. This module provides the date arithmetic shared by
//! the ledger builder and the period-closing engine.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to fiscal date arithmetic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiscalError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Fiscal year must be a positive integer, got {0}")]
    InvalidFiscalYear(i32),

    #[error("Date arithmetic overflowed past {0}")]
    DateOverflow(NaiveDate),
}

/// A fiscal year ordinal (1, 2, 3, ...) scoped to one company
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalYear(i32);

impl FiscalYear {
    pub fn new(year: i32) -> Result<Self, FiscalError> {
        if year < 1 {
            return Err(FiscalError::InvalidFiscalYear(year));
        }
        Ok(Self(year))
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// The fiscal year that follows this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// True for the second fiscal year onward (a prior period exists)
    pub fn has_predecessor(&self) -> bool {
        self.0 > 1
    }
}

impl std::fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FY{}", self.0)
    }
}

/// An inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FiscalError> {
        if start > end {
            return Err(FiscalError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Derives the bounds of the period that follows one ending on `end_date`:
/// it starts the next day and ends one year later minus a day.
pub fn next_period_bounds(end_date: NaiveDate) -> Result<DateRange, FiscalError> {
    let start = end_date
        .succ_opt()
        .ok_or(FiscalError::DateOverflow(end_date))?;
    let end = start
        .checked_add_months(Months::new(12))
        .and_then(|d| d.pred_opt())
        .ok_or(FiscalError::DateOverflow(start))?;
    DateRange::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fiscal_year_must_be_positive() {
        assert!(FiscalYear::new(0).is_err());
        assert!(FiscalYear::new(-3).is_err());
        assert_eq!(FiscalYear::new(1).unwrap().value(), 1);
    }

    #[test]
    fn test_fiscal_year_succession() {
        let first = FiscalYear::new(1).unwrap();
        assert!(!first.has_predecessor());
        assert_eq!(first.next().value(), 2);
        assert!(first.next().has_predecessor());
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(date(2024, 6, 1), date(2024, 5, 31)).is_err());
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 12, 31)));
        assert!(!range.contains(date(2025, 1, 1)));
    }

    #[test]
    fn test_next_period_bounds_calendar_year() {
        let next = next_period_bounds(date(2024, 12, 31)).unwrap();
        assert_eq!(next.start, date(2025, 1, 1));
        assert_eq!(next.end, date(2025, 12, 31));
    }

    #[test]
    fn test_next_period_bounds_off_calendar() {
        // A fiscal year ending mid-year rolls to the same boundary next year
        let next = next_period_bounds(date(2024, 3, 31)).unwrap();
        assert_eq!(next.start, date(2024, 4, 1));
        assert_eq!(next.end, date(2025, 3, 31));
    }

    #[test]
    fn test_next_period_bounds_leap_boundary() {
        let next = next_period_bounds(date(2023, 2, 28)).unwrap();
        assert_eq!(next.start, date(2023, 3, 1));
        assert_eq!(next.end, date(2024, 2, 29));
    }
}
