//! In-memory store adapter
//!
//! Implements every storage port over a mutex-guarded state, mirroring the
//! PostgreSQL adapter's atomicity: each port method takes the lock once, so
//! a method's changes become visible all at once or not at all. Service
//! tests run against this adapter without a database.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use core_kernel::{
    AccountId, CompanyId, DomainPort, FiscalYear, Money, PartnerId, PortError, VoucherId,
};
use domain_journal::validation::balance_totals;
use domain_journal::{
    Account, BusinessPartner, ChartStore, GeneralVoucher, JournalStore, NewGeneralVoucher,
    NewTradeVoucher, Posting, PostingQuery, TradeVoucher, VoucherNumber,
};
use domain_ledger::{
    CarryForwardBalance, CarryForwardPlan, ClosingStore, FiscalPeriod, SettlementCleanup,
    SettlementPlan,
};

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    partners: Vec<BusinessPartner>,
    general: BTreeMap<VoucherId, GeneralVoucher>,
    trade: BTreeMap<VoucherId, TradeVoucher>,
    periods: Vec<FiscalPeriod>,
    carry_forward: Vec<CarryForwardBalance>,
}

/// A port adapter backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_account(&self, account: Account) {
        self.lock().accounts.push(account);
    }

    pub fn seed_partner(&self, partner: BusinessPartner) {
        self.lock().partners.push(partner);
    }

    pub fn seed_period(&self, period: FiscalPeriod) {
        self.lock().periods.push(period);
    }

    pub fn seed_carry_forward(&self, row: CarryForwardBalance) {
        self.lock().carry_forward.push(row);
    }

    /// Snapshot of all carry-forward rows, for assertions
    pub fn carry_forward_snapshot(&self) -> Vec<CarryForwardBalance> {
        self.lock().carry_forward.clone()
    }

    /// Number of stored general vouchers, for assertions
    pub fn general_voucher_count(&self) -> usize {
        self.lock().general.len()
    }

    /// All general vouchers whose description starts with the given prefix
    pub fn general_vouchers_described(&self, prefix: &str) -> Vec<GeneralVoucher> {
        self.lock()
            .general
            .values()
            .filter(|v| v.description.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock poisoned")
    }
}

impl DomainPort for MemoryStore {}

fn next_number(state: &State, company_id: CompanyId, date: chrono::NaiveDate) -> VoucherNumber {
    let general = state
        .general
        .values()
        .filter(|v| v.company_id == company_id && v.date == date)
        .map(|v| v.number.sequence());
    let trade = state
        .trade
        .values()
        .filter(|v| v.company_id == company_id && v.date == date)
        .map(|v| v.number.sequence());
    VoucherNumber::after(date, general.chain(trade).max())
}

fn matches_query(posting: &Posting, query: &PostingQuery) -> bool {
    if let Some(account_id) = query.account_id {
        if posting.account_id != account_id {
            return false;
        }
    }
    if let Some(partner_id) = query.partner_id {
        if posting.partner_id != Some(partner_id) {
            return false;
        }
    }
    if let Some(range) = query.range {
        if !range.contains(posting.date) {
            return false;
        }
    }
    if query.exclude_settlement_marked && posting.settlement_marked {
        return false;
    }
    true
}

#[async_trait]
impl ChartStore for MemoryStore {
    async fn account_by_id(
        &self,
        company_id: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, PortError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.company_id == company_id && a.id == id)
            .cloned())
    }

    async fn account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<Account>, PortError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.company_id == company_id && a.code == code)
            .cloned())
    }

    async fn partner_by_id(
        &self,
        company_id: CompanyId,
        id: PartnerId,
    ) -> Result<Option<BusinessPartner>, PortError> {
        Ok(self
            .lock()
            .partners
            .iter()
            .find(|p| p.company_id == company_id && p.id == id)
            .cloned())
    }

    async fn partner_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<BusinessPartner>, PortError> {
        Ok(self
            .lock()
            .partners
            .iter()
            .find(|p| p.company_id == company_id && p.code == code)
            .cloned())
    }

    async fn accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
        let mut accounts: Vec<Account> = self
            .lock()
            .accounts
            .iter()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn insert_general(
        &self,
        voucher: NewGeneralVoucher,
    ) -> Result<GeneralVoucher, PortError> {
        let mut state = self.lock();
        let number = voucher
            .number
            .unwrap_or_else(|| next_number(&state, voucher.company_id, voucher.date));
        let (total_debit, total_credit) =
            balance_totals(voucher.lines.iter().map(|l| (l.side, l.amount)));
        let created = GeneralVoucher {
            id: VoucherId::new(),
            company_id: voucher.company_id,
            date: voucher.date,
            number,
            description: voucher.description,
            total_debit,
            total_credit,
            lines: voucher.lines,
        };
        state.general.insert(created.id, created.clone());
        Ok(created)
    }

    async fn insert_trade(&self, voucher: NewTradeVoucher) -> Result<TradeVoucher, PortError> {
        let mut state = self.lock();
        let number = voucher
            .number
            .unwrap_or_else(|| next_number(&state, voucher.company_id, voucher.date));
        let total_amount: Money = voucher.lines.iter().map(|l| l.amount).sum();
        let created = TradeVoucher {
            id: VoucherId::new(),
            company_id: voucher.company_id,
            date: voucher.date,
            number,
            kind: voucher.kind,
            partner_id: voucher.partner_id,
            description: voucher.description,
            supply_value: voucher.supply_value,
            vat_amount: voucher.vat_amount,
            total_amount,
            is_active: true,
            lines: voucher.lines,
        };
        state.trade.insert(created.id, created.clone());
        Ok(created)
    }

    async fn general_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<GeneralVoucher>, PortError> {
        Ok(self
            .lock()
            .general
            .get(&id)
            .filter(|v| v.company_id == company_id)
            .cloned())
    }

    async fn trade_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<TradeVoucher>, PortError> {
        Ok(self
            .lock()
            .trade
            .get(&id)
            .filter(|v| v.company_id == company_id)
            .cloned())
    }

    async fn update_general(&self, voucher: &GeneralVoucher) -> Result<(), PortError> {
        let mut state = self.lock();
        match state.general.get_mut(&voucher.id) {
            Some(stored) if stored.company_id == voucher.company_id => {
                *stored = voucher.clone();
                Ok(())
            }
            _ => Err(PortError::not_found("GeneralVoucher", voucher.id)),
        }
    }

    async fn update_trade(&self, voucher: &TradeVoucher) -> Result<(), PortError> {
        let mut state = self.lock();
        match state.trade.get_mut(&voucher.id) {
            Some(stored) if stored.company_id == voucher.company_id => {
                *stored = voucher.clone();
                Ok(())
            }
            _ => Err(PortError::not_found("TradeVoucher", voucher.id)),
        }
    }

    async fn delete_general(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<(), PortError> {
        let mut state = self.lock();
        let exists = state
            .general
            .get(&id)
            .is_some_and(|v| v.company_id == company_id);
        if !exists {
            return Err(PortError::not_found("GeneralVoucher", id));
        }
        state.general.remove(&id);
        Ok(())
    }

    async fn delete_trade(&self, company_id: CompanyId, id: VoucherId) -> Result<(), PortError> {
        let mut state = self.lock();
        let exists = state
            .trade
            .get(&id)
            .is_some_and(|v| v.company_id == company_id);
        if !exists {
            return Err(PortError::not_found("TradeVoucher", id));
        }
        state.trade.remove(&id);
        Ok(())
    }

    async fn set_trade_active(
        &self,
        company_id: CompanyId,
        id: VoucherId,
        active: bool,
    ) -> Result<(), PortError> {
        let mut state = self.lock();
        match state.trade.get_mut(&id) {
            Some(stored) if stored.company_id == company_id => {
                stored.is_active = active;
                Ok(())
            }
            _ => Err(PortError::not_found("TradeVoucher", id)),
        }
    }

    async fn postings(
        &self,
        company_id: CompanyId,
        query: PostingQuery,
    ) -> Result<Vec<Posting>, PortError> {
        let state = self.lock();
        let general = state
            .general
            .values()
            .filter(|v| v.company_id == company_id)
            .flat_map(|v| v.postings());
        let trade = state
            .trade
            .values()
            .filter(|v| v.company_id == company_id)
            .flat_map(|v| v.postings());
        Ok(general
            .chain(trade)
            .filter(|p| matches_query(p, &query))
            .collect())
    }
}

#[async_trait]
impl ClosingStore for MemoryStore {
    async fn period(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Option<FiscalPeriod>, PortError> {
        Ok(self
            .lock()
            .periods
            .iter()
            .find(|p| p.company_id == company_id && p.fiscal_year == fiscal_year)
            .cloned())
    }

    async fn update_period(&self, period: &FiscalPeriod) -> Result<(), PortError> {
        let mut state = self.lock();
        let stored = state
            .periods
            .iter_mut()
            .find(|p| p.company_id == period.company_id && p.fiscal_year == period.fiscal_year)
            .ok_or_else(|| PortError::not_found("FiscalPeriod", period.fiscal_year))?;
        *stored = period.clone();
        Ok(())
    }

    async fn carry_forward_rows(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Vec<CarryForwardBalance>, PortError> {
        Ok(self
            .lock()
            .carry_forward
            .iter()
            .filter(|row| row.company_id == company_id && row.fiscal_year == fiscal_year)
            .cloned()
            .collect())
    }

    async fn apply_carry_forward(&self, plan: &CarryForwardPlan) -> Result<(), PortError> {
        let mut state = self.lock();
        if let Some(period) = &plan.create_period {
            let exists = state
                .periods
                .iter()
                .any(|p| p.company_id == period.company_id && p.fiscal_year == period.fiscal_year);
            if !exists {
                state.periods.push(period.clone());
            }
        }
        state.carry_forward.retain(|row| {
            !(row.company_id == plan.company_id && row.fiscal_year == plan.target_year)
        });
        state.carry_forward.extend(plan.rows.iter().cloned());
        Ok(())
    }

    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<Vec<VoucherNumber>, PortError> {
        let mut state = self.lock();

        match &plan.cleanup {
            SettlementCleanup::AllMarked => {
                state.general.retain(|_, v| {
                    !(v.company_id == plan.company_id
                        && domain_journal::is_settlement_marked(&v.description))
                });
            }
            SettlementCleanup::ExactDescription(description) => {
                state.general.retain(|_, v| {
                    !(v.company_id == plan.company_id && v.description == *description)
                });
            }
        }

        if let Some(update) = &plan.disposal_update {
            let period = state
                .periods
                .iter_mut()
                .find(|p| {
                    p.company_id == plan.company_id && p.fiscal_year == update.fiscal_year
                })
                .ok_or_else(|| PortError::not_found("FiscalPeriod", update.fiscal_year))?;
            period.current_disposal_date = Some(update.current_disposal_date);
            period.previous_disposal_date = update.previous_disposal_date;
        }

        let mut numbers = Vec::with_capacity(plan.vouchers.len());
        for voucher in &plan.vouchers {
            let number = next_number(&state, plan.company_id, voucher.date);
            let mut created = GeneralVoucher::new(
                VoucherId::new(),
                plan.company_id,
                voucher.date,
                number,
                voucher.description.clone(),
            );
            for line in &voucher.lines {
                created.push_line(
                    line.account_id,
                    None,
                    line.side,
                    line.amount,
                    line.description.clone(),
                );
            }
            numbers.push(created.number);
            state.general.insert(created.id, created);
        }

        Ok(numbers)
    }
}
