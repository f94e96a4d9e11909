//! Carry-forward / period-closing engine
//!
//! Computes each account's (and each account-partner pair's) net balance at
//! a fiscal-period boundary and persists it as the opening balance of the
//! next period. The computation is a pure plan over fetched state; the store
//! applies the plan atomically (delete the target year's rows, insert the
//! replacements, create the next period when missing). Re-running replaces
//! the previous run's output wholesale.
//!
//! The net formula is `opening(from_year) + turnover(from period)`.
//! Historical transactions are never re-summed, so prior carry-ins can never
//! be double-booked.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId, DebitCredit, FiscalYear, PartnerId};
use domain_journal::AccountType;

use crate::error::LedgerError;
use crate::period::FiscalPeriod;

/// An account's (or account-partner pair's) opening balance for one fiscal
/// year. At most one side is non-zero: net presentation, not gross turnover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryForwardBalance {
    pub company_id: CompanyId,
    /// The fiscal year this balance is the *opening* balance for
    pub fiscal_year: FiscalYear,
    pub account_id: AccountId,
    /// Absent for account-level totals; present for sub-ledger balances
    pub partner_id: Option<PartnerId>,
    pub balance: DebitCredit,
}

/// State snapshot the carry-forward plan is computed from.
///
/// Net values are signed, debit-positive. Account-level maps cover all
/// postings of the account; pair maps cover only partner-attributed postings.
#[derive(Debug, Clone, Default)]
pub struct CarryForwardInputs {
    pub account_types: BTreeMap<AccountId, AccountType>,
    /// Account-level carry-forward nets of the source year
    pub opening_by_account: BTreeMap<AccountId, Decimal>,
    /// Pair-level carry-forward nets of the source year
    pub opening_by_pair: BTreeMap<(AccountId, PartnerId), Decimal>,
    /// Account-level net turnover within the source period
    pub turnover_by_account: BTreeMap<AccountId, Decimal>,
    /// Pair-level net turnover within the source period
    pub turnover_by_pair: BTreeMap<(AccountId, PartnerId), Decimal>,
}

/// The rows a carry-forward run will write, plus the period it may create
#[derive(Debug, Clone)]
pub struct CarryForwardPlan {
    pub company_id: CompanyId,
    /// Year whose existing rows are deleted and replaced
    pub target_year: FiscalYear,
    /// Present when the target period does not exist yet
    pub create_period: Option<FiscalPeriod>,
    pub rows: Vec<CarryForwardBalance>,
    pub accounts_carried: usize,
    pub partners_carried: usize,
}

/// Computes the carry-forward plan for the period following `from_period`.
///
/// Only ASSET, LIABILITY, and EQUITY accounts with a non-zero net are
/// carried; REVENUE and EXPENSE balances belong to settlement and must not
/// survive a period boundary.
pub fn plan_carry_forward(
    from_period: &FiscalPeriod,
    next_period_exists: bool,
    inputs: &CarryForwardInputs,
) -> Result<CarryForwardPlan, LedgerError> {
    let target_year = from_period.fiscal_year.next();
    let create_period = if next_period_exists {
        None
    } else {
        Some(from_period.following()?)
    };

    let mut rows = Vec::new();

    // Account-level rows
    let account_keys: BTreeSet<AccountId> = inputs
        .opening_by_account
        .keys()
        .chain(inputs.turnover_by_account.keys())
        .copied()
        .collect();
    let mut accounts_carried = 0;
    for account_id in account_keys {
        if !carries_forward(&inputs.account_types, account_id) {
            continue;
        }
        let net = net_for(
            inputs.opening_by_account.get(&account_id),
            inputs.turnover_by_account.get(&account_id),
        );
        if net.is_zero() {
            continue;
        }
        rows.push(CarryForwardBalance {
            company_id: from_period.company_id,
            fiscal_year: target_year,
            account_id,
            partner_id: None,
            balance: DebitCredit::from_net(net),
        });
        accounts_carried += 1;
    }

    // Sub-ledger rows, same type filter and formula per (account, partner)
    let pair_keys: BTreeSet<(AccountId, PartnerId)> = inputs
        .opening_by_pair
        .keys()
        .chain(inputs.turnover_by_pair.keys())
        .copied()
        .collect();
    let mut partners_carried = 0;
    for (account_id, partner_id) in pair_keys {
        if !carries_forward(&inputs.account_types, account_id) {
            continue;
        }
        let net = net_for(
            inputs.opening_by_pair.get(&(account_id, partner_id)),
            inputs.turnover_by_pair.get(&(account_id, partner_id)),
        );
        if net.is_zero() {
            continue;
        }
        rows.push(CarryForwardBalance {
            company_id: from_period.company_id,
            fiscal_year: target_year,
            account_id,
            partner_id: Some(partner_id),
            balance: DebitCredit::from_net(net),
        });
        partners_carried += 1;
    }

    Ok(CarryForwardPlan {
        company_id: from_period.company_id,
        target_year,
        create_period,
        rows,
        accounts_carried,
        partners_carried,
    })
}

fn carries_forward(types: &BTreeMap<AccountId, AccountType>, account_id: AccountId) -> bool {
    types
        .get(&account_id)
        .is_some_and(|t| t.carries_forward())
}

fn net_for(opening: Option<&Decimal>, turnover: Option<&Decimal>) -> Decimal {
    opening.copied().unwrap_or_default() + turnover.copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::FiscalYear;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(year: i32) -> FiscalPeriod {
        FiscalPeriod::new(
            CompanyId::new(),
            FiscalYear::new(year).unwrap(),
            date(2023 + year, 1, 1),
            date(2023 + year, 12, 31),
        )
    }

    fn inputs_with(
        entries: Vec<(AccountId, AccountType, Decimal, Decimal)>,
    ) -> CarryForwardInputs {
        let mut inputs = CarryForwardInputs::default();
        for (id, account_type, opening, turnover) in entries {
            inputs.account_types.insert(id, account_type);
            if !opening.is_zero() {
                inputs.opening_by_account.insert(id, opening);
            }
            if !turnover.is_zero() {
                inputs.turnover_by_account.insert(id, turnover);
            }
        }
        inputs
    }

    #[test]
    fn test_net_is_opening_plus_period_turnover() {
        let asset = AccountId::new();
        let inputs = inputs_with(vec![(
            asset,
            AccountType::Asset,
            dec!(1_000_000),
            dec!(500_000),
        )]);

        let plan = plan_carry_forward(&period(1), true, &inputs).unwrap();

        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].balance.debit.amount(), dec!(1_500_000));
        assert!(plan.rows[0].balance.credit.is_zero());
        assert_eq!(plan.rows[0].fiscal_year.value(), 2);
        assert_eq!(plan.accounts_carried, 1);
    }

    #[test]
    fn test_revenue_and_expense_are_never_carried() {
        let revenue = AccountId::new();
        let expense = AccountId::new();
        let inputs = inputs_with(vec![
            (revenue, AccountType::Revenue, dec!(0), dec!(-500_000)),
            (expense, AccountType::Expense, dec!(0), dec!(120_000)),
        ]);

        let plan = plan_carry_forward(&period(1), true, &inputs).unwrap();
        assert!(plan.rows.is_empty());
        assert_eq!(plan.accounts_carried, 0);
    }

    #[test]
    fn test_zero_net_accounts_produce_no_rows() {
        let asset = AccountId::new();
        let inputs = inputs_with(vec![(asset, AccountType::Asset, dec!(300), dec!(-300))]);

        let plan = plan_carry_forward(&period(1), true, &inputs).unwrap();
        assert!(plan.rows.is_empty());
    }

    #[test]
    fn test_liability_carries_on_the_credit_side() {
        let liability = AccountId::new();
        let inputs = inputs_with(vec![(
            liability,
            AccountType::Liability,
            dec!(-40_000),
            dec!(-10_000),
        )]);

        let plan = plan_carry_forward(&period(1), true, &inputs).unwrap();
        assert_eq!(plan.rows[0].balance.credit.amount(), dec!(50_000));
        assert!(plan.rows[0].balance.debit.is_zero());
    }

    #[test]
    fn test_missing_next_period_is_created_contiguously() {
        let from = period(1);
        let plan = plan_carry_forward(&from, false, &CarryForwardInputs::default()).unwrap();

        let created = plan.create_period.expect("period should be created");
        assert_eq!(created.fiscal_year.value(), 2);
        assert_eq!(created.start_date, from.end_date.succ_opt().unwrap());
        assert_eq!(created.end_date, date(2025, 12, 31));
    }

    #[test]
    fn test_existing_next_period_is_left_alone() {
        let plan =
            plan_carry_forward(&period(1), true, &CarryForwardInputs::default()).unwrap();
        assert!(plan.create_period.is_none());
    }

    #[test]
    fn test_pair_rows_follow_the_same_type_filter() {
        let receivable = AccountId::new();
        let revenue = AccountId::new();
        let partner = PartnerId::new();

        let mut inputs = CarryForwardInputs::default();
        inputs.account_types.insert(receivable, AccountType::Asset);
        inputs.account_types.insert(revenue, AccountType::Revenue);
        inputs
            .turnover_by_pair
            .insert((receivable, partner), dec!(7_700));
        inputs
            .turnover_by_pair
            .insert((revenue, partner), dec!(-7_700));

        let plan = plan_carry_forward(&period(1), true, &inputs).unwrap();

        assert_eq!(plan.partners_carried, 1);
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].partner_id, Some(partner));
        assert_eq!(plan.rows[0].account_id, receivable);
    }

    #[test]
    fn test_plan_is_deterministic_for_identical_state() {
        let a = AccountId::new();
        let b = AccountId::new();
        let inputs = inputs_with(vec![
            (a, AccountType::Asset, dec!(10), dec!(5)),
            (b, AccountType::Liability, dec!(-20), dec!(0)),
        ]);

        let first = plan_carry_forward(&period(1), true, &inputs).unwrap();
        let second = plan_carry_forward(&period(1), true, &inputs).unwrap();
        assert_eq!(first.rows, second.rows);
    }
}
