//! Report derivation
//!
//! Pure, read-only projections over per-account summaries. Every report
//! consumes [`AccountSummary`] rows built by the ledger builder's opening
//! resolution, so statements can never disagree with the ledger views they
//! sit next to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DebitCredit, Money};
use domain_journal::AccountType;

use crate::ledger::AccountSummary;

/// One account of the trial balance: opening + turnover = closing, every
/// column split to its debit/credit side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub opening: DebitCredit,
    pub turnover_debit: Money,
    pub turnover_credit: Money,
    pub closing: DebitCredit,
}

/// The trial balance with reconciling totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    pub total_opening_debit: Money,
    pub total_opening_credit: Money,
    pub total_turnover_debit: Money,
    pub total_turnover_credit: Money,
    pub total_closing_debit: Money,
    pub total_closing_credit: Money,
    /// True when the closing debit and credit columns reconcile
    pub is_balanced: bool,
}

/// Derives the trial balance from per-account summaries
pub fn trial_balance(mut summaries: Vec<AccountSummary>) -> TrialBalance {
    summaries.sort_by(|a, b| a.account_code.cmp(&b.account_code));

    let mut total_opening_debit = Money::zero();
    let mut total_opening_credit = Money::zero();
    let mut total_turnover_debit = Money::zero();
    let mut total_turnover_credit = Money::zero();
    let mut total_closing_debit = Money::zero();
    let mut total_closing_credit = Money::zero();

    let rows: Vec<TrialBalanceRow> = summaries
        .into_iter()
        .map(|s| {
            total_opening_debit += s.opening.debit;
            total_opening_credit += s.opening.credit;
            total_turnover_debit += s.turnover_debit;
            total_turnover_credit += s.turnover_credit;
            total_closing_debit += s.closing.debit;
            total_closing_credit += s.closing.credit;
            TrialBalanceRow {
                account_code: s.account_code,
                account_name: s.account_name,
                account_type: s.account_type,
                opening: s.opening,
                turnover_debit: s.turnover_debit,
                turnover_credit: s.turnover_credit,
                closing: s.closing,
            }
        })
        .collect();

    TrialBalance {
        rows,
        total_opening_debit,
        total_opening_credit,
        total_turnover_debit,
        total_turnover_credit,
        is_balanced: total_closing_debit == total_closing_credit,
        total_closing_debit,
        total_closing_credit,
    }
}

/// One balance sheet position, shown on its natural side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetRow {
    pub account_code: String,
    pub account_name: String,
    pub amount: Decimal,
}

/// Assets against liabilities plus equity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub assets: Vec<BalanceSheetRow>,
    pub liabilities: Vec<BalanceSheetRow>,
    pub equity: Vec<BalanceSheetRow>,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
}

/// Derives the balance sheet from the same closing balances as the trial
/// balance. After a fully-closed period, assets equal liabilities plus
/// equity because no revenue/expense balance survives settlement.
pub fn balance_sheet(summaries: &[AccountSummary]) -> BalanceSheet {
    let mut assets = Vec::new();
    let mut liabilities = Vec::new();
    let mut equity = Vec::new();
    let mut total_assets = Decimal::ZERO;
    let mut total_liabilities = Decimal::ZERO;
    let mut total_equity = Decimal::ZERO;

    let mut sorted: Vec<&AccountSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| a.account_code.cmp(&b.account_code));

    for summary in sorted {
        let net = summary.closing.net();
        if net.is_zero() {
            continue;
        }
        let row = |amount: Decimal| BalanceSheetRow {
            account_code: summary.account_code.clone(),
            account_name: summary.account_name.clone(),
            amount,
        };
        match summary.account_type {
            AccountType::Asset => {
                total_assets += net;
                assets.push(row(net));
            }
            AccountType::Liability => {
                total_liabilities += -net;
                liabilities.push(row(-net));
            }
            AccountType::Equity => {
                total_equity += -net;
                equity.push(row(-net));
            }
            AccountType::Revenue | AccountType::Expense => {}
        }
    }

    BalanceSheet {
        assets,
        liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
    }
}

/// One income statement position, shown with its natural sign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementRow {
    pub account_code: String,
    pub account_name: String,
    pub amount: Decimal,
}

/// Revenue and expense nets for the period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub revenues: Vec<IncomeStatementRow>,
    pub expenses: Vec<IncomeStatementRow>,
    pub total_revenue: Decimal,
    pub total_expense: Decimal,
    pub net_income: Decimal,
}

/// Derives the income statement from profit-and-loss turnover summaries.
/// Callers feed summaries built with settlement-marked vouchers excluded
/// and no opening fold-in (profit and loss never carries an opening).
pub fn income_statement(summaries: &[AccountSummary]) -> IncomeStatement {
    let mut revenues = Vec::new();
    let mut expenses = Vec::new();
    let mut total_revenue = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;

    let mut sorted: Vec<&AccountSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| a.account_code.cmp(&b.account_code));

    for summary in sorted {
        let net = summary.turnover_debit.amount() - summary.turnover_credit.amount();
        if net.is_zero() {
            continue;
        }
        match summary.account_type {
            AccountType::Revenue => {
                revenues.push(IncomeStatementRow {
                    account_code: summary.account_code.clone(),
                    account_name: summary.account_name.clone(),
                    amount: -net,
                });
                total_revenue += -net;
            }
            AccountType::Expense => {
                expenses.push(IncomeStatementRow {
                    account_code: summary.account_code.clone(),
                    account_name: summary.account_name.clone(),
                    amount: net,
                });
                total_expense += net;
            }
            _ => {}
        }
    }

    IncomeStatement {
        revenues,
        expenses,
        total_revenue,
        total_expense,
        net_income: total_revenue - total_expense,
    }
}
