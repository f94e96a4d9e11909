//! Settlement engine
//!
//! Two cascading sub-operations close a fiscal year's income:
//! 1. income settlement sweeps every revenue/expense net into the Net-Income
//!    control account, one consolidated voucher per direction;
//! 2. retained-earnings settlement moves the resulting Net-Income balance
//!    into Retained-Earnings.
//!
//! Both are compute-then-apply plans. Generated vouchers carry the
//! settlement marker in their description; a re-run first deletes its own
//! prior output by that marker and then recreates it, so the engines are
//! idempotent over unchanged journals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId, FiscalYear, Money, BALANCE_TOLERANCE};
use domain_journal::{is_settlement_marked, Account, Side};

use crate::error::LedgerError;
use crate::period::FiscalPeriod;

/// Header description of the revenue sweep voucher
pub const REVENUE_SWEEP_DESCRIPTION: &str = "[CLOSING] revenue accounts -> net income";
/// Header description of the expense sweep voucher
pub const EXPENSE_SWEEP_DESCRIPTION: &str = "[CLOSING] expense accounts -> net income";
/// Header description of the retained-earnings disposal voucher
pub const RETAINED_EARNINGS_DESCRIPTION: &str = "[CLOSING] net income -> retained earnings";

/// One profit-and-loss account's net turnover for the period, signed
/// debit-positive (revenue accounts normally come out negative)
#[derive(Debug, Clone)]
pub struct ProfitLossNet {
    pub account_id: AccountId,
    pub account_name: String,
    pub net: Decimal,
}

/// A line of a voucher the settlement engine will generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementLine {
    pub account_id: AccountId,
    pub side: Side,
    pub amount: Money,
    pub description: Option<String>,
}

/// A voucher the settlement engine will generate. The store assigns the
/// number at apply time, after the cleanup delete, so freed sequences on the
/// posting date are reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementVoucher {
    pub date: NaiveDate,
    pub description: String,
    pub lines: Vec<SettlementLine>,
}

impl SettlementVoucher {
    /// Signed debit-minus-credit total of the generated lines
    pub fn net(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.amount.amount() * l.side.sign())
            .sum()
    }
}

/// Which prior settlement vouchers a run deletes before inserting its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementCleanup {
    /// Every voucher whose description carries the settlement marker.
    /// Income settlement uses this: re-running it invalidates any
    /// downstream retained-earnings voucher too, which must then be re-run.
    AllMarked,
    /// Only vouchers with this exact description
    ExactDescription(String),
}

/// Disposal-date metadata persisted on the fiscal period row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalUpdate {
    pub fiscal_year: FiscalYear,
    pub current_disposal_date: NaiveDate,
    pub previous_disposal_date: Option<NaiveDate>,
}

/// The atomic unit a settlement run hands to the store
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub company_id: CompanyId,
    pub cleanup: SettlementCleanup,
    pub vouchers: Vec<SettlementVoucher>,
    pub disposal_update: Option<DisposalUpdate>,
}

/// Computes the income settlement plan.
///
/// `nets` are per-account net turnovers within the period, already excluding
/// settlement-marked vouchers. Accounts are grouped by the side their net
/// falls on, not by their declared type, so contra balances settle on the
/// correct side. Near-zero nets are skipped. No activity at all is a valid
/// no-op plan (cleanup only).
pub fn plan_income_settlement(
    period: &FiscalPeriod,
    nets: &[ProfitLossNet],
    net_income: &Account,
) -> Result<SettlementPlan, LedgerError> {
    let mut revenue_lines = Vec::new();
    let mut expense_lines = Vec::new();
    let mut total_revenue = Money::zero();
    let mut total_expense = Money::zero();

    for entry in nets {
        if entry.net.abs() < BALANCE_TOLERANCE {
            continue;
        }
        let amount = Money::new(entry.net.abs());
        let description = Some(format!("closing transfer {}", entry.account_name));
        if entry.net < Decimal::ZERO {
            // Credit balance: swept by debiting the account
            revenue_lines.push(SettlementLine {
                account_id: entry.account_id,
                side: Side::Debit,
                amount,
                description,
            });
            total_revenue += amount;
        } else {
            expense_lines.push(SettlementLine {
                account_id: entry.account_id,
                side: Side::Credit,
                amount,
                description,
            });
            total_expense += amount;
        }
    }

    let mut vouchers = Vec::new();

    if !revenue_lines.is_empty() {
        let mut lines = revenue_lines;
        lines.push(SettlementLine {
            account_id: net_income.id,
            side: Side::Credit,
            amount: total_revenue,
            description: Some("closing transfer net income".to_string()),
        });
        vouchers.push(SettlementVoucher {
            date: period.end_date,
            description: REVENUE_SWEEP_DESCRIPTION.to_string(),
            lines,
        });
    }

    if !expense_lines.is_empty() {
        let mut lines = vec![SettlementLine {
            account_id: net_income.id,
            side: Side::Debit,
            amount: total_expense,
            description: Some("closing transfer net income".to_string()),
        }];
        lines.extend(expense_lines);
        vouchers.push(SettlementVoucher {
            date: period.end_date,
            description: EXPENSE_SWEEP_DESCRIPTION.to_string(),
            lines,
        });
    }

    for voucher in &vouchers {
        ensure_internally_balanced(voucher)?;
    }

    Ok(SettlementPlan {
        company_id: period.company_id,
        cleanup: SettlementCleanup::AllMarked,
        vouchers,
        disposal_update: None,
    })
}

/// Computes the retained-earnings settlement plan.
///
/// `net_income_net` is the Net-Income account's signed net turnover within
/// the period, including the settlement vouchers that funded it. A zero
/// balance means income settlement has not run (or produced nothing) and the
/// operation fails rather than writing an empty disposal.
pub fn plan_retained_earnings(
    period: &FiscalPeriod,
    net_income_net: Decimal,
    net_income: &Account,
    retained_earnings: &Account,
    current_disposal_date: NaiveDate,
    previous_disposal_date: Option<NaiveDate>,
) -> Result<SettlementPlan, LedgerError> {
    let year = period.fiscal_year;
    if year.has_predecessor() && previous_disposal_date.is_none() {
        return Err(LedgerError::MissingPreviousDisposalDate {
            year: year.value(),
        });
    }
    if net_income_net.abs() < BALANCE_TOLERANCE {
        return Err(LedgerError::PriorSettlementRequired {
            year: year.value(),
        });
    }

    let amount = Money::new(net_income_net.abs());
    // Net income normally sits as a credit on 998; a net loss reverses the
    // disposal direction
    let (net_income_side, retained_side) = if net_income_net < Decimal::ZERO {
        (Side::Debit, Side::Credit)
    } else {
        (Side::Credit, Side::Debit)
    };

    let voucher = SettlementVoucher {
        date: current_disposal_date,
        description: RETAINED_EARNINGS_DESCRIPTION.to_string(),
        lines: vec![
            SettlementLine {
                account_id: net_income.id,
                side: net_income_side,
                amount,
                description: Some("closing transfer net income".to_string()),
            },
            SettlementLine {
                account_id: retained_earnings.id,
                side: retained_side,
                amount,
                description: Some("closing transfer retained earnings".to_string()),
            },
        ],
    };
    ensure_internally_balanced(&voucher)?;

    Ok(SettlementPlan {
        company_id: period.company_id,
        cleanup: SettlementCleanup::ExactDescription(RETAINED_EARNINGS_DESCRIPTION.to_string()),
        vouchers: vec![voucher],
        disposal_update: Some(DisposalUpdate {
            fiscal_year: year,
            current_disposal_date,
            previous_disposal_date,
        }),
    })
}

/// A generated voucher violating the double-entry invariant is a consistency
/// failure: the run aborts, nothing is applied.
fn ensure_internally_balanced(voucher: &SettlementVoucher) -> Result<(), LedgerError> {
    if voucher.net().abs() >= BALANCE_TOLERANCE {
        return Err(LedgerError::Consistency(format!(
            "generated settlement voucher '{}' does not balance (net {})",
            voucher.description,
            voucher.net()
        )));
    }
    Ok(())
}
