//! Voucher families and the unified posting view
//!
//! Two heterogeneous transaction families exist: free-form general vouchers
//! and partner-bound trade vouchers. Both flatten into [`Posting`], the one
//! line-oriented shape the ledger builder, reports, and closing engines
//! consume. Downstream code never matches on the concrete families.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId, Money, PartnerId, VoucherId, BALANCE_TOLERANCE};

use crate::numbering::VoucherNumber;

/// Description prefix that tags settlement-generated vouchers.
///
/// The settlement engine deletes every voucher carrying this marker before
/// re-running, and the income statement excludes marked vouchers from net
/// turnover. The prefix is persisted, so changing it orphans old markers.
pub const SETTLEMENT_MARKER: &str = "[CLOSING]";

/// True when a voucher description tags a settlement-generated voucher
pub fn is_settlement_marked(description: &str) -> bool {
    description.starts_with(SETTLEMENT_MARKER)
}

/// Side of a posting (debit or credit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    /// Signed multiplier: debits increase a debit-positive running balance
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Debit => Decimal::ONE,
            Side::Credit => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        }
    }
}

/// Which voucher family a posting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherKind {
    General,
    Trade,
}

/// A line of a general voucher
///
/// Exactly one side carries the amount; `side` plus a positive `amount`
/// encode that invariant structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLine {
    /// 1-based position within the voucher
    pub line_no: u32,
    pub account_id: AccountId,
    /// Optional partner reference for sub-ledger reporting
    pub partner_id: Option<PartnerId>,
    pub side: Side,
    pub amount: Money,
    pub description: Option<String>,
    /// Free-form classification code carried through from entry screens
    pub classification_code: Option<String>,
}

/// A free-form journal voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralVoucher {
    pub id: VoucherId,
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub number: VoucherNumber,
    pub description: String,
    /// Stored totals, recomputed on every line mutation
    pub total_debit: Money,
    pub total_credit: Money,
    pub lines: Vec<GeneralLine>,
}

impl GeneralVoucher {
    pub fn new(
        id: VoucherId,
        company_id: CompanyId,
        date: NaiveDate,
        number: VoucherNumber,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            company_id,
            date,
            number,
            description: description.into(),
            total_debit: Money::zero(),
            total_credit: Money::zero(),
            lines: Vec::new(),
        }
    }

    /// Appends a debit line, assigning the next line number
    pub fn debit(mut self, account_id: AccountId, amount: Money) -> Self {
        self.push_line(account_id, None, Side::Debit, amount, None);
        self
    }

    /// Appends a credit line, assigning the next line number
    pub fn credit(mut self, account_id: AccountId, amount: Money) -> Self {
        self.push_line(account_id, None, Side::Credit, amount, None);
        self
    }

    /// Appends a line and recomputes the stored totals
    pub fn push_line(
        &mut self,
        account_id: AccountId,
        partner_id: Option<PartnerId>,
        side: Side,
        amount: Money,
        description: Option<String>,
    ) {
        let line_no = self.lines.len() as u32 + 1;
        self.lines.push(GeneralLine {
            line_no,
            account_id,
            partner_id,
            side,
            amount,
            description,
            classification_code: None,
        });
        self.recompute_totals();
    }

    /// Recomputes the stored debit/credit totals from the line set
    pub fn recompute_totals(&mut self) {
        self.total_debit = self
            .lines
            .iter()
            .filter(|l| l.side == Side::Debit)
            .map(|l| l.amount)
            .sum();
        self.total_credit = self
            .lines
            .iter()
            .filter(|l| l.side == Side::Credit)
            .map(|l| l.amount)
            .sum();
    }

    /// True when debits equal credits within the balance tolerance
    pub fn is_balanced(&self) -> bool {
        (self.total_debit.amount() - self.total_credit.amount()).abs() < BALANCE_TOLERANCE
    }

    /// Flattens this voucher into the unified posting view
    pub fn postings(&self) -> Vec<Posting> {
        let marked = is_settlement_marked(&self.description);
        self.lines
            .iter()
            .map(|line| Posting {
                kind: VoucherKind::General,
                voucher_id: self.id,
                company_id: self.company_id,
                date: self.date,
                number: self.number,
                line_no: line.line_no,
                account_id: line.account_id,
                partner_id: line.partner_id,
                side: line.side,
                amount: line.amount,
                description: line.description.clone(),
                settlement_marked: marked,
            })
            .collect()
    }
}

/// Whether a trade voucher records a sale or a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Sale,
    Purchase,
}

/// A line of a trade voucher. The partner lives on the header; every line
/// inherits it in the posting view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLine {
    pub line_no: u32,
    pub account_id: AccountId,
    pub side: Side,
    pub amount: Money,
    pub description: Option<String>,
    pub classification_code: Option<String>,
}

/// A sales/purchase voucher, always bound to exactly one business partner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeVoucher {
    pub id: VoucherId,
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub number: VoucherNumber,
    pub kind: TradeKind,
    pub partner_id: PartnerId,
    pub description: String,
    /// Tax sub-fields; persisted and surfaced, never ledger arithmetic
    pub supply_value: Money,
    pub vat_amount: Money,
    /// Stored total, recomputed on every line mutation
    pub total_amount: Money,
    /// Deactivated trade vouchers are invisible to ledgers, reports, closing
    pub is_active: bool,
    pub lines: Vec<TradeLine>,
}

impl TradeVoucher {
    /// Recomputes the stored total from the line set
    pub fn recompute_totals(&mut self) {
        self.total_amount = self.lines.iter().map(|l| l.amount).sum();
    }

    /// True when debits equal credits within the balance tolerance
    pub fn is_balanced(&self) -> bool {
        let net: Decimal = self
            .lines
            .iter()
            .map(|l| l.amount.amount() * l.side.sign())
            .sum();
        net.abs() < BALANCE_TOLERANCE
    }

    /// Flattens this voucher into the unified posting view.
    /// Inactive vouchers produce no postings.
    pub fn postings(&self) -> Vec<Posting> {
        if !self.is_active {
            return Vec::new();
        }
        let marked = is_settlement_marked(&self.description);
        self.lines
            .iter()
            .map(|line| Posting {
                kind: VoucherKind::Trade,
                voucher_id: self.id,
                company_id: self.company_id,
                date: self.date,
                number: self.number,
                line_no: line.line_no,
                account_id: line.account_id,
                partner_id: Some(self.partner_id),
                side: line.side,
                amount: line.amount,
                description: line.description.clone(),
                settlement_marked: marked,
            })
            .collect()
    }
}

/// One voucher line flattened into the shape shared by both families
///
/// This is the only shape the ledger builder and the closing engines see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub kind: VoucherKind,
    pub voucher_id: VoucherId,
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub number: VoucherNumber,
    pub line_no: u32,
    pub account_id: AccountId,
    pub partner_id: Option<PartnerId>,
    pub side: Side,
    pub amount: Money,
    pub description: Option<String>,
    /// True when the parent voucher carries the settlement marker
    pub settlement_marked: bool,
}

impl Posting {
    /// The canonical global ordering key: `(date, number, line_no)`.
    /// Ledgers and reports sort by exactly this, nothing else.
    pub fn ordering_key(&self) -> (NaiveDate, VoucherNumber, u32) {
        (self.date, self.number, self.line_no)
    }

    /// Signed amount: debits positive, credits negative
    pub fn signed_amount(&self) -> Decimal {
        self.amount.amount() * self.side.sign()
    }
}
