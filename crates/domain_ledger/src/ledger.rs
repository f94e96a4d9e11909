//! Ledger builder
//!
//! Merges the unified posting view into chronological running-balance
//! sequences. The same opening-balance resolution feeds both the per-line
//! ledger and the per-account summaries, so list and detail views can never
//! disagree about an opening figure.
//!
//! Running balances are signed, debit-positive: debits increase, credits
//! decrease, regardless of the account's normal side.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DebitCredit, Money};
use domain_journal::{Account, AccountType, Posting, Side, VoucherNumber};

/// One row of a running-balance ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Posting date; absent on the synthetic carried-forward row
    pub date: Option<NaiveDate>,
    /// Voucher number; absent on the synthetic carried-forward row
    pub reference: Option<VoucherNumber>,
    pub line_no: Option<u32>,
    pub side: Side,
    pub amount: Money,
    /// Balance after this row, signed debit-positive
    pub running_balance: Decimal,
    pub description: Option<String>,
    /// True only for the synthetic leading row
    pub carried_forward: bool,
}

/// A fully built ledger for one account (or account-partner) key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerView {
    /// Opening balance, signed debit-positive
    pub opening: Decimal,
    pub rows: Vec<LedgerRow>,
    /// In-window turnover totals (the carried-forward row is excluded)
    pub total_debit: Money,
    pub total_credit: Money,
    /// Balance after the last row
    pub closing: Decimal,
}

/// Folds pre-window activity into a stored carry-forward net. Used when a
/// caller narrows the window to start after the fiscal-year start: the
/// opening must reflect everything between the year start and the window
/// start without mutating any stored carry-forward row.
pub fn fold_opening(carry_forward_net: Decimal, pre_window: &[Posting]) -> Decimal {
    pre_window
        .iter()
        .fold(carry_forward_net, |acc, p| acc + p.signed_amount())
}

/// Builds the running-balance sequence for one key from its opening balance
/// and in-window postings. Postings are sorted here by the canonical
/// `(date, number, line_no)` order; callers pass them unordered.
pub fn build_ledger(opening: Decimal, mut postings: Vec<Posting>) -> LedgerView {
    postings.sort_by_key(|p| p.ordering_key());

    let mut rows = Vec::with_capacity(postings.len() + 1);
    if !opening.is_zero() {
        rows.push(LedgerRow {
            date: None,
            reference: None,
            line_no: None,
            side: if opening > Decimal::ZERO {
                Side::Debit
            } else {
                Side::Credit
            },
            amount: Money::new(opening.abs()),
            running_balance: opening,
            description: Some("carried forward".to_string()),
            carried_forward: true,
        });
    }

    let mut running = opening;
    let mut total_debit = Money::zero();
    let mut total_credit = Money::zero();
    for posting in postings {
        running += posting.signed_amount();
        match posting.side {
            Side::Debit => total_debit += posting.amount,
            Side::Credit => total_credit += posting.amount,
        }
        rows.push(LedgerRow {
            date: Some(posting.date),
            reference: Some(posting.number),
            line_no: Some(posting.line_no),
            side: posting.side,
            amount: posting.amount,
            running_balance: running,
            description: posting.description,
            carried_forward: false,
        });
    }

    LedgerView {
        opening,
        rows,
        total_debit,
        total_credit,
        closing: running,
    }
}

/// Per-account aggregate row for listing sidebars
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub opening: DebitCredit,
    pub turnover_debit: Money,
    pub turnover_credit: Money,
    pub closing: DebitCredit,
}

/// Aggregates one account's window. Returns `None` for accounts with zero
/// opening and zero activity - they are omitted from list views while
/// remaining valid ledger targets.
pub fn summarize_account(
    account: &Account,
    opening_net: Decimal,
    window_postings: &[Posting],
) -> Option<AccountSummary> {
    if opening_net.is_zero() && window_postings.is_empty() {
        return None;
    }

    let (turnover_debit, turnover_credit) = turnover_totals(window_postings);
    let closing_net = opening_net + turnover_debit.amount() - turnover_credit.amount();

    Some(AccountSummary {
        account_code: account.code.clone(),
        account_name: account.name.clone(),
        account_type: account.account_type,
        opening: DebitCredit::from_net(opening_net),
        turnover_debit,
        turnover_credit,
        closing: DebitCredit::from_net(closing_net),
    })
}

/// Per-partner aggregate row for one account's sub-ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerSummary {
    pub partner_code: String,
    pub partner_name: String,
    pub opening: DebitCredit,
    pub turnover_debit: Money,
    pub turnover_credit: Money,
    pub closing: DebitCredit,
}

pub fn summarize_partner(
    partner_code: &str,
    partner_name: &str,
    opening_net: Decimal,
    window_postings: &[Posting],
) -> Option<PartnerSummary> {
    if opening_net.is_zero() && window_postings.is_empty() {
        return None;
    }

    let (turnover_debit, turnover_credit) = turnover_totals(window_postings);
    let closing_net = opening_net + turnover_debit.amount() - turnover_credit.amount();

    Some(PartnerSummary {
        partner_code: partner_code.to_string(),
        partner_name: partner_name.to_string(),
        opening: DebitCredit::from_net(opening_net),
        turnover_debit,
        turnover_credit,
        closing: DebitCredit::from_net(closing_net),
    })
}

fn turnover_totals(postings: &[Posting]) -> (Money, Money) {
    let mut debit = Money::zero();
    let mut credit = Money::zero();
    for p in postings {
        match p.side {
            Side::Debit => debit += p.amount,
            Side::Credit => credit += p.amount,
        }
    }
    (debit, credit)
}
