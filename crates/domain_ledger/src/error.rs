//! Ledger domain errors
//!
//! Three families, matching how callers recover:
//! - validation errors (bad references, malformed queries) - resubmit
//!   corrected input;
//! - state errors (closing an already-closed period, settling before income
//!   settlement ran, carrying forward from a missing period) - rejected with
//!   no partial mutation;
//! - consistency errors (a generated settlement voucher failing its own
//!   balance check) - fatal for the operation, everything rolled back.

use thiserror::Error;

use core_kernel::{FiscalError, PortError};

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Account '{code}' does not exist")]
    AccountNotFound { code: String },

    #[error("Business partner '{code}' does not exist")]
    PartnerNotFound { code: String },

    #[error("Fiscal period {year} does not exist")]
    PeriodNotFound { year: i32 },

    #[error("Fiscal period {year} is already closed")]
    PeriodAlreadyClosed { year: i32 },

    #[error("Fiscal period {year} is not closed")]
    PeriodNotClosed { year: i32 },

    /// Retained-earnings settlement requires a prior income settlement
    /// (the Net-Income balance is zero)
    #[error("Income settlement must run before retained-earnings settlement for fiscal year {year}")]
    PriorSettlementRequired { year: i32 },

    /// From the second fiscal year onward the previous disposal date is
    /// mandatory
    #[error("Previous disposal date is required for fiscal year {year}")]
    MissingPreviousDisposalDate { year: i32 },

    /// A reserved control account (net income / retained earnings) is
    /// missing from the company's chart
    #[error("Control account '{code}' is missing from the chart of accounts")]
    ControlAccountMissing { code: &'static str },

    /// An internally generated voucher violated the double-entry invariant;
    /// the operation is aborted and rolled back
    #[error("Consistency failure: {0}")]
    Consistency(String),

    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    #[error(transparent)]
    Storage(#[from] PortError),
}

impl LedgerError {
    /// True for precondition failures on period/settlement state
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            LedgerError::PeriodNotFound { .. }
                | LedgerError::PeriodAlreadyClosed { .. }
                | LedgerError::PeriodNotClosed { .. }
                | LedgerError::PriorSettlementRequired { .. }
                | LedgerError::MissingPreviousDisposalDate { .. }
        )
    }
}
