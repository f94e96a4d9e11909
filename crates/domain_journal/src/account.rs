//! Account reference data
//!
//! Accounts are created and edited by an external chart-of-accounts service;
//! this core consumes them as already-validated reference data and never
//! mutates them. Identity is immutable once a voucher line references it.

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId};

/// Account code of the Net-Income control account, reserved in every
/// company's chart. Income settlement sweeps revenue/expense balances here.
pub const NET_INCOME_CODE: &str = "998";

/// Account code of the Retained-Earnings control account. Retained-earnings
/// settlement moves the Net-Income balance here.
pub const RETAINED_EARNINGS_CODE: &str = "999";

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// The side on which this account type normally carries its balance
    pub fn normal_side(&self) -> NormalSide {
        match self {
            AccountType::Asset | AccountType::Expense => NormalSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalSide::Credit
            }
        }
    }

    /// True for the balance-sheet types that carry forward across fiscal
    /// periods. Revenue and expense balances are settled, never carried.
    pub fn carries_forward(&self) -> bool {
        matches!(
            self,
            AccountType::Asset | AccountType::Liability | AccountType::Equity
        )
    }

    /// True for the income-statement types swept by income settlement
    pub fn is_profit_and_loss(&self) -> bool {
        matches!(self, AccountType::Revenue | AccountType::Expense)
    }
}

/// Normal balance side of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalSide {
    Debit,
    Credit,
}

/// An account in a company's chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Owning company
    pub company_id: CompanyId,
    /// Account code, unique per company (e.g. "101")
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Whether the account accepts new postings
    pub is_active: bool,
}

impl Account {
    pub fn new(
        id: AccountId,
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id,
            company_id,
            code: code.into(),
            name: name.into(),
            account_type,
            is_active: true,
        }
    }

    /// The side on which this account normally carries its balance
    pub fn normal_side(&self) -> NormalSide {
        self.account_type.normal_side()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_side_by_type() {
        assert_eq!(AccountType::Asset.normal_side(), NormalSide::Debit);
        assert_eq!(AccountType::Expense.normal_side(), NormalSide::Debit);
        assert_eq!(AccountType::Liability.normal_side(), NormalSide::Credit);
        assert_eq!(AccountType::Equity.normal_side(), NormalSide::Credit);
        assert_eq!(AccountType::Revenue.normal_side(), NormalSide::Credit);
    }

    #[test]
    fn test_only_balance_sheet_types_carry_forward() {
        assert!(AccountType::Asset.carries_forward());
        assert!(AccountType::Liability.carries_forward());
        assert!(AccountType::Equity.carries_forward());
        assert!(!AccountType::Revenue.carries_forward());
        assert!(!AccountType::Expense.carries_forward());
    }

    #[test]
    fn test_profit_and_loss_partition() {
        for account_type in [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ] {
            assert_ne!(
                account_type.carries_forward(),
                account_type.is_profit_and_loss()
            );
        }
    }
}
