//! Ledger domain - balances, period closing, and statements
//!
//! Builds running-balance ledgers from the unified posting view, carries
//! account balances across fiscal-period boundaries, performs the cascading
//! settlement that zeroes revenue/expense into net income and net income into
//! retained earnings, and derives the trial balance, balance sheet, and
//! income statement.
//!
//! The closing engines are compute-then-apply: each derives a pure plan
//! (rows to delete, rows to insert) from fetched state, and the store applies
//! the plan as one atomic unit. Re-running a closing therefore replaces its
//! own prior output instead of stacking on top of it.

pub mod carry_forward;
pub mod error;
pub mod ledger;
pub mod period;
pub mod ports;
pub mod reports;
pub mod services;
pub mod settlement;

pub use carry_forward::{CarryForwardBalance, CarryForwardInputs, CarryForwardPlan};
pub use error::LedgerError;
pub use ledger::{AccountSummary, LedgerRow, LedgerView, PartnerSummary};
pub use period::FiscalPeriod;
pub use ports::ClosingStore;
pub use reports::{BalanceSheet, IncomeStatement, TrialBalance, TrialBalanceRow};
pub use services::{
    CarryForwardSummary, ClosingService, LedgerQuery, LedgerService, SettlementOutcome,
};
pub use settlement::{
    DisposalUpdate, SettlementCleanup, SettlementLine, SettlementPlan, SettlementVoucher,
    EXPENSE_SWEEP_DESCRIPTION, RETAINED_EARNINGS_DESCRIPTION, REVENUE_SWEEP_DESCRIPTION,
};
