//! Test fixtures
//!
//! Pre-built reference data: a company with a small standard chart of
//! accounts (including the reserved control accounts), two business
//! partners, and calendar-year fiscal periods.

use chrono::NaiveDate;
use core_kernel::{AccountId, CompanyId, FiscalYear, PartnerId};
use domain_journal::{Account, AccountType, BusinessPartner};
use domain_ledger::FiscalPeriod;

/// A company with a ready-to-use chart of accounts and partner registry
pub struct CompanyFixture {
    pub company_id: CompanyId,
    pub accounts: Vec<Account>,
    pub partners: Vec<BusinessPartner>,
}

impl CompanyFixture {
    /// A small trading company: cash, receivables, payables, capital, sales,
    /// a couple of expense accounts, and the 998/999 control accounts
    pub fn standard() -> Self {
        let company_id = CompanyId::new();
        let account = |code: &str, name: &str, account_type| {
            Account::new(AccountId::new(), company_id, code, name, account_type)
        };

        let accounts = vec![
            account("101", "Cash", AccountType::Asset),
            account("110", "Accounts Receivable", AccountType::Asset),
            account("130", "Merchandise Inventory", AccountType::Asset),
            account("201", "Accounts Payable", AccountType::Liability),
            account("301", "Capital Stock", AccountType::Equity),
            account("401", "Sales", AccountType::Revenue),
            account("402", "Interest Income", AccountType::Revenue),
            account("501", "Wages Expense", AccountType::Expense),
            account("502", "Rent Expense", AccountType::Expense),
            account("998", "Net Income", AccountType::Equity),
            account("999", "Retained Earnings", AccountType::Equity),
        ];

        let partners = vec![
            BusinessPartner::new(PartnerId::new(), company_id, "00001", "Acme Trading"),
            BusinessPartner::new(PartnerId::new(), company_id, "00002", "Globex Supply"),
        ];

        Self {
            company_id,
            accounts,
            partners,
        }
    }

    /// Looks an account up by code; panics on a code the fixture lacks
    pub fn account(&self, code: &str) -> &Account {
        self.accounts
            .iter()
            .find(|a| a.code == code)
            .unwrap_or_else(|| panic!("fixture has no account '{code}'"))
    }

    /// Looks a partner up by code
    pub fn partner(&self, code: &str) -> &BusinessPartner {
        self.partners
            .iter()
            .find(|p| p.code == code)
            .unwrap_or_else(|| panic!("fixture has no partner '{code}'"))
    }

    /// A calendar-year fiscal period for this company
    pub fn calendar_period(&self, fiscal_year: i32, calendar_year: i32) -> FiscalPeriod {
        FiscalPeriod::new(
            self.company_id,
            FiscalYear::new(fiscal_year).expect("fixture fiscal year"),
            date(calendar_year, 1, 1),
            date(calendar_year, 12, 31),
        )
    }
}

/// Shorthand for test dates
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("fixture date")
}
