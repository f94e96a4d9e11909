//! Ledger and closing application services
//!
//! The operations behind the ledger, fiscal-period, settlement, and report
//! endpoints. Read services are side-effect-free; closing services compute a
//! pure plan and hand the store one atomic unit to apply.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{AccountId, CompanyId, DateRange, FiscalError, FiscalYear, PartnerId, VoucherId};
use domain_journal::{
    Account, ChartStore, JournalStore, Posting, PostingQuery, VoucherNumber, NET_INCOME_CODE,
    RETAINED_EARNINGS_CODE,
};

use crate::carry_forward::{plan_carry_forward, CarryForwardInputs};
use crate::error::LedgerError;
use crate::ledger::{
    build_ledger, fold_opening, summarize_account, summarize_partner, AccountSummary, LedgerView,
    PartnerSummary,
};
use crate::period::FiscalPeriod;
use crate::ports::ClosingStore;
use crate::reports::{
    balance_sheet, income_statement, trial_balance, BalanceSheet, IncomeStatement, TrialBalance,
};
use crate::settlement::{
    plan_income_settlement, plan_retained_earnings, ProfitLossNet, RETAINED_EARNINGS_DESCRIPTION,
};

/// Parameters of a ledger read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub account_code: String,
    pub partner_code: Option<String>,
    /// Resolves the opening balance from this year's carry-forward rows
    pub fiscal_year: Option<i32>,
    /// Narrows the window; defaults to the fiscal period's full range
    pub range: Option<DateRange>,
}

/// Result of a carry-forward run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CarryForwardSummary {
    pub accounts_carried: usize,
    pub partners_carried: usize,
}

/// Result of a settlement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub vouchers_created: Vec<VoucherNumber>,
}

/// Side-effect-free ledger and report reads
pub struct LedgerService<S> {
    store: Arc<S>,
}

impl<S> LedgerService<S>
where
    S: JournalStore + ChartStore + ClosingStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Builds the running-balance ledger for one account (or one
    /// account-partner pair)
    pub async fn ledger(
        &self,
        company_id: CompanyId,
        query: LedgerQuery,
    ) -> Result<LedgerView, LedgerError> {
        let account = self.account_by_code(company_id, &query.account_code).await?;
        let partner_id = match &query.partner_code {
            Some(code) => Some(self.partner_by_code(company_id, code).await?),
            None => None,
        };

        let (opening, window) = self
            .resolve_opening(company_id, account.id, partner_id, query.fiscal_year, query.range)
            .await?;

        let mut posting_query = PostingQuery::for_account(account.id);
        if let Some(partner_id) = partner_id {
            posting_query = posting_query.with_partner(partner_id);
        }
        if let Some(window) = window {
            posting_query = posting_query.within(window);
        }
        let postings = self.store.postings(company_id, posting_query).await?;

        Ok(build_ledger(opening, postings))
    }

    /// Per-account aggregates over a window, for listing sidebars. Uses the
    /// identical opening resolution as [`Self::ledger`]; accounts with zero
    /// opening and zero activity are omitted.
    pub async fn summary(
        &self,
        company_id: CompanyId,
        fiscal_year: Option<i32>,
        range: Option<DateRange>,
    ) -> Result<Vec<AccountSummary>, LedgerError> {
        let accounts = self.store.accounts(company_id).await?;

        let (openings, window) = self
            .account_openings(company_id, fiscal_year, range)
            .await?;

        let mut posting_query = PostingQuery::default();
        if let Some(window) = window {
            posting_query = posting_query.within(window);
        }
        let postings = self.store.postings(company_id, posting_query).await?;
        let by_account = group_by_account(postings);
        let empty = Vec::new();

        let mut summaries = Vec::new();
        for account in &accounts {
            let opening = openings.get(&account.id).copied().unwrap_or_default();
            let window_postings = by_account.get(&account.id).unwrap_or(&empty);
            if let Some(summary) = summarize_account(account, opening, window_postings) {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.account_code.cmp(&b.account_code));
        Ok(summaries)
    }

    /// Per-partner aggregates of one account's sub-ledger
    pub async fn partner_summary(
        &self,
        company_id: CompanyId,
        account_code: &str,
        fiscal_year: Option<i32>,
        range: Option<DateRange>,
    ) -> Result<Vec<PartnerSummary>, LedgerError> {
        let account = self.account_by_code(company_id, account_code).await?;

        // Pair-level openings for the requested year
        let mut openings: HashMap<PartnerId, Decimal> = HashMap::new();
        let mut window = range;
        if let Some(year) = fiscal_year {
            let period = self.required_period(company_id, year).await?;
            for row in self
                .store
                .carry_forward_rows(company_id, period.fiscal_year)
                .await?
            {
                if row.account_id == account.id {
                    if let Some(partner_id) = row.partner_id {
                        openings.insert(partner_id, row.balance.net());
                    }
                }
            }
            let window_range = range.unwrap_or_else(|| period.range());
            if window_range.start > period.start_date {
                let pre_window = self
                    .store
                    .postings(
                        company_id,
                        PostingQuery::for_account(account.id).within(pre_window_range(
                            period.start_date,
                            window_range.start,
                        )?),
                    )
                    .await?;
                for posting in pre_window {
                    if let Some(partner_id) = posting.partner_id {
                        *openings.entry(partner_id).or_default() += posting.signed_amount();
                    }
                }
            }
            window = Some(window_range);
        }

        let mut posting_query = PostingQuery::for_account(account.id);
        if let Some(window) = window {
            posting_query = posting_query.within(window);
        }
        let postings = self.store.postings(company_id, posting_query).await?;

        let mut by_partner: BTreeMap<PartnerId, Vec<Posting>> = BTreeMap::new();
        for posting in postings {
            if let Some(partner_id) = posting.partner_id {
                by_partner.entry(partner_id).or_default().push(posting);
            }
        }
        for partner_id in openings.keys() {
            by_partner.entry(*partner_id).or_default();
        }

        let mut summaries = Vec::new();
        for (partner_id, partner_postings) in by_partner {
            let partner = self
                .store
                .partner_by_id(company_id, partner_id)
                .await?
                .ok_or_else(|| LedgerError::PartnerNotFound {
                    code: partner_id.to_string(),
                })?;
            let opening = openings.get(&partner_id).copied().unwrap_or_default();
            if let Some(summary) =
                summarize_partner(&partner.code, &partner.name, opening, &partner_postings)
            {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.partner_code.cmp(&b.partner_code));
        Ok(summaries)
    }

    /// The trial balance of a fiscal year: opening + turnover = closing
    pub async fn trial_balance(
        &self,
        company_id: CompanyId,
        fiscal_year: i32,
    ) -> Result<TrialBalance, LedgerError> {
        let period = self.required_period(company_id, fiscal_year).await?;
        let summaries = self
            .period_summaries(company_id, &period, false, true)
            .await?;
        Ok(trial_balance(summaries))
    }

    /// The balance sheet of a fiscal year, from the same closing balances as
    /// the trial balance
    pub async fn balance_sheet(
        &self,
        company_id: CompanyId,
        fiscal_year: i32,
    ) -> Result<BalanceSheet, LedgerError> {
        let period = self.required_period(company_id, fiscal_year).await?;
        let summaries = self
            .period_summaries(company_id, &period, false, true)
            .await?;
        Ok(balance_sheet(&summaries))
    }

    /// The income statement of a fiscal year, excluding settlement-generated
    /// vouchers
    pub async fn income_statement(
        &self,
        company_id: CompanyId,
        fiscal_year: i32,
    ) -> Result<IncomeStatement, LedgerError> {
        let period = self.required_period(company_id, fiscal_year).await?;
        let summaries = self
            .period_summaries(company_id, &period, true, false)
            .await?;
        Ok(income_statement(&summaries))
    }

    /// Opening resolution shared by ledger detail reads: carry-forward net
    /// for the exact `(account, partner)` key, plus pre-window turnover when
    /// the window starts after the fiscal-year start. Returns the opening
    /// and the effective window.
    async fn resolve_opening(
        &self,
        company_id: CompanyId,
        account_id: AccountId,
        partner_id: Option<PartnerId>,
        fiscal_year: Option<i32>,
        range: Option<DateRange>,
    ) -> Result<(Decimal, Option<DateRange>), LedgerError> {
        let Some(year) = fiscal_year else {
            return Ok((Decimal::ZERO, range));
        };
        let period = self.required_period(company_id, year).await?;

        let carry_forward_net = self
            .store
            .carry_forward_rows(company_id, period.fiscal_year)
            .await?
            .into_iter()
            .find(|row| row.account_id == account_id && row.partner_id == partner_id)
            .map(|row| row.balance.net())
            .unwrap_or_default();

        let window = range.unwrap_or_else(|| period.range());
        let opening = if window.start > period.start_date {
            let mut pre_query = PostingQuery::for_account(account_id)
                .within(pre_window_range(period.start_date, window.start)?);
            if let Some(partner_id) = partner_id {
                pre_query = pre_query.with_partner(partner_id);
            }
            let pre_window = self.store.postings(company_id, pre_query).await?;
            fold_opening(carry_forward_net, &pre_window)
        } else {
            carry_forward_net
        };

        Ok((opening, Some(window)))
    }

    /// Account-level openings for summary reads, mirroring
    /// [`Self::resolve_opening`] over every account at once
    async fn account_openings(
        &self,
        company_id: CompanyId,
        fiscal_year: Option<i32>,
        range: Option<DateRange>,
    ) -> Result<(HashMap<AccountId, Decimal>, Option<DateRange>), LedgerError> {
        let Some(year) = fiscal_year else {
            return Ok((HashMap::new(), range));
        };
        let period = self.required_period(company_id, year).await?;

        let mut openings: HashMap<AccountId, Decimal> = HashMap::new();
        for row in self
            .store
            .carry_forward_rows(company_id, period.fiscal_year)
            .await?
        {
            if row.partner_id.is_none() {
                openings.insert(row.account_id, row.balance.net());
            }
        }

        let window = range.unwrap_or_else(|| period.range());
        if window.start > period.start_date {
            let pre_window = self
                .store
                .postings(
                    company_id,
                    PostingQuery::default()
                        .within(pre_window_range(period.start_date, window.start)?),
                )
                .await?;
            for posting in pre_window {
                *openings.entry(posting.account_id).or_default() += posting.signed_amount();
            }
        }

        Ok((openings, Some(window)))
    }

    /// Builds per-account summaries over a full fiscal period
    async fn period_summaries(
        &self,
        company_id: CompanyId,
        period: &FiscalPeriod,
        exclude_settlement_marked: bool,
        with_opening: bool,
    ) -> Result<Vec<AccountSummary>, LedgerError> {
        let accounts = self.store.accounts(company_id).await?;

        let mut openings: HashMap<AccountId, Decimal> = HashMap::new();
        if with_opening {
            for row in self
                .store
                .carry_forward_rows(company_id, period.fiscal_year)
                .await?
            {
                if row.partner_id.is_none() {
                    openings.insert(row.account_id, row.balance.net());
                }
            }
        }

        let mut posting_query = PostingQuery::default().within(period.range());
        if exclude_settlement_marked {
            posting_query = posting_query.excluding_settlement();
        }
        let postings = self.store.postings(company_id, posting_query).await?;
        let by_account = group_by_account(postings);
        let empty = Vec::new();

        let mut summaries = Vec::new();
        for account in &accounts {
            let opening = openings.get(&account.id).copied().unwrap_or_default();
            let window_postings = by_account.get(&account.id).unwrap_or(&empty);
            if let Some(summary) = summarize_account(account, opening, window_postings) {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    async fn account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Account, LedgerError> {
        self.store
            .account_by_code(company_id, code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                code: code.to_string(),
            })
    }

    async fn partner_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<PartnerId, LedgerError> {
        Ok(self
            .store
            .partner_by_code(company_id, code)
            .await?
            .ok_or_else(|| LedgerError::PartnerNotFound {
                code: code.to_string(),
            })?
            .id)
    }

    async fn required_period(
        &self,
        company_id: CompanyId,
        year: i32,
    ) -> Result<FiscalPeriod, LedgerError> {
        required_period(self.store.as_ref(), company_id, year).await
    }
}

/// Period closing, carry-forward, and settlement
pub struct ClosingService<S> {
    store: Arc<S>,
}

impl<S> ClosingService<S>
where
    S: JournalStore + ChartStore + ClosingStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Carries every account's (and account-partner pair's) net balance at
    /// the end of `from_year` into the opening of `from_year + 1`, creating
    /// the next period when missing. Fully re-runnable.
    pub async fn carry_forward(
        &self,
        company_id: CompanyId,
        from_year: i32,
    ) -> Result<CarryForwardSummary, LedgerError> {
        let from_period = required_period(self.store.as_ref(), company_id, from_year).await?;
        let next_exists = self
            .store
            .period(company_id, from_period.fiscal_year.next())
            .await?
            .is_some();

        let mut inputs = CarryForwardInputs::default();
        for account in self.store.accounts(company_id).await? {
            inputs.account_types.insert(account.id, account.account_type);
        }
        for row in self
            .store
            .carry_forward_rows(company_id, from_period.fiscal_year)
            .await?
        {
            let net = row.balance.net();
            match row.partner_id {
                None => {
                    inputs.opening_by_account.insert(row.account_id, net);
                }
                Some(partner_id) => {
                    inputs
                        .opening_by_pair
                        .insert((row.account_id, partner_id), net);
                }
            }
        }
        let postings = self
            .store
            .postings(company_id, PostingQuery::default().within(from_period.range()))
            .await?;
        for posting in &postings {
            let signed = posting.signed_amount();
            *inputs
                .turnover_by_account
                .entry(posting.account_id)
                .or_default() += signed;
            if let Some(partner_id) = posting.partner_id {
                *inputs
                    .turnover_by_pair
                    .entry((posting.account_id, partner_id))
                    .or_default() += signed;
            }
        }

        let plan = plan_carry_forward(&from_period, next_exists, &inputs)?;
        self.store.apply_carry_forward(&plan).await?;

        info!(
            company = %company_id,
            from_year,
            accounts = plan.accounts_carried,
            partners = plan.partners_carried,
            "carry-forward applied"
        );
        Ok(CarryForwardSummary {
            accounts_carried: plan.accounts_carried,
            partners_carried: plan.partners_carried,
        })
    }

    /// Marks a fiscal period closed
    pub async fn close_period(
        &self,
        company_id: CompanyId,
        year: i32,
    ) -> Result<(), LedgerError> {
        let mut period = required_period(self.store.as_ref(), company_id, year).await?;
        period.close()?;
        self.store.update_period(&period).await?;
        info!(company = %company_id, year, "fiscal period closed");
        Ok(())
    }

    /// Reverts a close
    pub async fn reopen_period(
        &self,
        company_id: CompanyId,
        year: i32,
    ) -> Result<(), LedgerError> {
        let mut period = required_period(self.store.as_ref(), company_id, year).await?;
        period.reopen()?;
        self.store.update_period(&period).await?;
        info!(company = %company_id, year, "fiscal period reopened");
        Ok(())
    }

    /// Sweeps revenue/expense nets into the Net-Income control account.
    /// Re-runnable: prior settlement vouchers are deleted and recreated in
    /// the same atomic unit.
    pub async fn settle_income(
        &self,
        company_id: CompanyId,
        year: i32,
    ) -> Result<SettlementOutcome, LedgerError> {
        let period = required_period(self.store.as_ref(), company_id, year).await?;
        let net_income = self.control_account(company_id, NET_INCOME_CODE).await?;

        let accounts = self.store.accounts(company_id).await?;
        let postings = self
            .store
            .postings(
                company_id,
                PostingQuery::default()
                    .within(period.range())
                    .excluding_settlement(),
            )
            .await?;
        let mut turnover: HashMap<AccountId, Decimal> = HashMap::new();
        for posting in &postings {
            *turnover.entry(posting.account_id).or_default() += posting.signed_amount();
        }

        let mut nets = Vec::new();
        for account in accounts
            .iter()
            .filter(|a| a.account_type.is_profit_and_loss())
        {
            let net = turnover.get(&account.id).copied().unwrap_or_default();
            if !net.is_zero() {
                nets.push(ProfitLossNet {
                    account_id: account.id,
                    account_name: account.name.clone(),
                    net,
                });
            }
        }

        let plan = plan_income_settlement(&period, &nets, &net_income)?;
        let vouchers_created = self.store.apply_settlement(&plan).await?;

        info!(
            company = %company_id,
            year,
            vouchers = vouchers_created.len(),
            "income settlement applied"
        );
        Ok(SettlementOutcome { vouchers_created })
    }

    /// Moves the full Net-Income balance into Retained-Earnings, dated at
    /// the current disposal date, and persists both disposal dates on the
    /// period row. Requires income settlement to have run first.
    pub async fn settle_retained_earnings(
        &self,
        company_id: CompanyId,
        year: i32,
        current_disposal_date: NaiveDate,
        previous_disposal_date: Option<NaiveDate>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let period = required_period(self.store.as_ref(), company_id, year).await?;
        let net_income = self.control_account(company_id, NET_INCOME_CODE).await?;
        let retained = self
            .control_account(company_id, RETAINED_EARNINGS_CODE)
            .await?;

        // The income-settlement vouchers fund the Net-Income balance, so
        // marked vouchers count here. A prior disposal voucher dated inside
        // the period must not: it is about to be replaced, and counting it
        // would zero the balance it re-disposes.
        let postings = self
            .store
            .postings(
                company_id,
                PostingQuery::for_account(net_income.id).within(period.range()),
            )
            .await?;
        let mut prior_disposals: HashMap<VoucherId, bool> = HashMap::new();
        let mut net_income_net = Decimal::ZERO;
        for posting in &postings {
            let is_prior_disposal = match prior_disposals.get(&posting.voucher_id) {
                Some(flag) => *flag,
                None => {
                    let flag = posting.settlement_marked
                        && self
                            .store
                            .general_by_id(company_id, posting.voucher_id)
                            .await?
                            .is_some_and(|v| v.description == RETAINED_EARNINGS_DESCRIPTION);
                    prior_disposals.insert(posting.voucher_id, flag);
                    flag
                }
            };
            if !is_prior_disposal {
                net_income_net += posting.signed_amount();
            }
        }

        let plan = plan_retained_earnings(
            &period,
            net_income_net,
            &net_income,
            &retained,
            current_disposal_date,
            previous_disposal_date,
        )?;
        let vouchers_created = self.store.apply_settlement(&plan).await?;

        info!(company = %company_id, year, "retained-earnings settlement applied");
        Ok(SettlementOutcome { vouchers_created })
    }

    async fn control_account(
        &self,
        company_id: CompanyId,
        code: &'static str,
    ) -> Result<Account, LedgerError> {
        self.store
            .account_by_code(company_id, code)
            .await?
            .ok_or(LedgerError::ControlAccountMissing { code })
    }
}

async fn required_period<S: ClosingStore + ?Sized>(
    store: &S,
    company_id: CompanyId,
    year: i32,
) -> Result<FiscalPeriod, LedgerError> {
    let fiscal_year = FiscalYear::new(year)?;
    store
        .period(company_id, fiscal_year)
        .await?
        .ok_or(LedgerError::PeriodNotFound { year })
}

fn group_by_account(postings: Vec<Posting>) -> HashMap<AccountId, Vec<Posting>> {
    let mut by_account: HashMap<AccountId, Vec<Posting>> = HashMap::new();
    for posting in postings {
        by_account.entry(posting.account_id).or_default().push(posting);
    }
    by_account
}

/// The window between a period start and a narrowed window start
fn pre_window_range(
    period_start: NaiveDate,
    window_start: NaiveDate,
) -> Result<DateRange, LedgerError> {
    let end = window_start
        .pred_opt()
        .ok_or(FiscalError::DateOverflow(window_start))?;
    Ok(DateRange::new(period_start, end)?)
}
