//! Closing storage ports
//!
//! Carry-forward rows, fiscal periods, and the atomic application of closing
//! plans. Both closing engines compute their plans in this crate and hand
//! them to an adapter, which must apply each plan as one transaction:
//! either every row change commits or none do.

use async_trait::async_trait;

use core_kernel::{CompanyId, DomainPort, FiscalYear, PortError};
use domain_journal::VoucherNumber;

use crate::carry_forward::{CarryForwardBalance, CarryForwardPlan};
use crate::period::FiscalPeriod;
use crate::settlement::SettlementPlan;

/// Storage for fiscal periods and carry-forward balances
#[async_trait]
pub trait ClosingStore: DomainPort {
    async fn period(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Option<FiscalPeriod>, PortError>;

    /// Persists the mutable period fields (closed flag, disposal dates)
    async fn update_period(&self, period: &FiscalPeriod) -> Result<(), PortError>;

    /// All carry-forward rows opening the given fiscal year
    async fn carry_forward_rows(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Vec<CarryForwardBalance>, PortError>;

    /// Applies a carry-forward plan atomically: deletes the target year's
    /// existing rows, inserts the plan's rows, and creates the target period
    /// when the plan carries one. Concurrent closings of the same
    /// `(company, target year)` must serialize; the second caller blocks or
    /// fails cleanly, never interleaves.
    async fn apply_carry_forward(&self, plan: &CarryForwardPlan) -> Result<(), PortError>;

    /// Applies a settlement plan atomically: deletes prior vouchers matching
    /// the plan's cleanup, inserts the generated vouchers (numbering them
    /// after the delete so freed sequences are reused), and persists any
    /// disposal-date update. Returns the numbers of the created vouchers.
    /// The same serialization rule as carry-forward applies.
    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<Vec<VoucherNumber>, PortError>;
}
