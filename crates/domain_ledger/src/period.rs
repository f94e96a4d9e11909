//! Fiscal periods
//!
//! Periods are company-scoped, contiguous, non-overlapping, and numbered from
//! 1. They are created on first use or auto-created by the carry-forward
//! engine when advancing into a year that does not exist yet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{next_period_bounds, CompanyId, DateRange, FiscalError, FiscalYear, PeriodId};

use crate::error::LedgerError;

/// One fiscal period of a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub id: PeriodId,
    pub company_id: CompanyId,
    pub fiscal_year: FiscalYear,
    pub start_date: NaiveDate,
    /// Always the day before the next period's start
    pub end_date: NaiveDate,
    pub closed: bool,
    /// Retained-earnings disposal metadata; not used in balance arithmetic
    pub current_disposal_date: Option<NaiveDate>,
    pub previous_disposal_date: Option<NaiveDate>,
}

impl FiscalPeriod {
    pub fn new(
        company_id: CompanyId,
        fiscal_year: FiscalYear,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: PeriodId::new(),
            company_id,
            fiscal_year,
            start_date,
            end_date,
            closed: false,
            current_disposal_date: None,
            previous_disposal_date: None,
        }
    }

    /// Derives the period that follows this one: starts the day after this
    /// period ends and runs one year minus a day
    pub fn following(&self) -> Result<FiscalPeriod, FiscalError> {
        let bounds = next_period_bounds(self.end_date)?;
        Ok(FiscalPeriod::new(
            self.company_id,
            self.fiscal_year.next(),
            bounds.start,
            bounds.end,
        ))
    }

    /// The period's date window
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Marks the period closed
    pub fn close(&mut self) -> Result<(), LedgerError> {
        if self.closed {
            return Err(LedgerError::PeriodAlreadyClosed {
                year: self.fiscal_year.value(),
            });
        }
        self.closed = true;
        Ok(())
    }

    /// Reverts a close
    pub fn reopen(&mut self) -> Result<(), LedgerError> {
        if !self.closed {
            return Err(LedgerError::PeriodNotClosed {
                year: self.fiscal_year.value(),
            });
        }
        self.closed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period() -> FiscalPeriod {
        FiscalPeriod::new(
            CompanyId::new(),
            FiscalYear::new(1).unwrap(),
            date(2024, 1, 1),
            date(2024, 12, 31),
        )
    }

    #[test]
    fn test_close_then_reopen() {
        let mut p = period();
        p.close().unwrap();
        assert!(p.closed);
        p.reopen().unwrap();
        assert!(!p.closed);
    }

    #[test]
    fn test_double_close_is_a_state_error() {
        let mut p = period();
        p.close().unwrap();
        let err = p.close().unwrap_err();
        assert!(err.is_state_error());
    }

    #[test]
    fn test_reopen_of_open_period_is_a_state_error() {
        let mut p = period();
        let err = p.reopen().unwrap_err();
        assert!(matches!(err, LedgerError::PeriodNotClosed { year: 1 }));
    }

    #[test]
    fn test_following_period_is_contiguous() {
        let p = period();
        let next = p.following().unwrap();
        assert_eq!(next.fiscal_year.value(), 2);
        assert_eq!(next.start_date, date(2025, 1, 1));
        assert_eq!(next.end_date, date(2025, 12, 31));
        assert!(!next.closed);
        assert_eq!(next.company_id, p.company_id);
    }
}
