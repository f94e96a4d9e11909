//! Test data builders
//!
//! Builder patterns for voucher requests with sensible defaults, so tests
//! spell out only the fields they care about.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use domain_journal::{
    LineInput, Side, TradeKind, TradeLineInput, TradeVoucherInput, VoucherInput,
};

/// Builder for general voucher requests
pub struct VoucherInputBuilder {
    date: NaiveDate,
    description: String,
    lines: Vec<LineInput>,
}

impl VoucherInputBuilder {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            description: "test voucher".to_string(),
            lines: Vec::new(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a debit line against an account code
    pub fn debit(mut self, account_code: &str, amount: Decimal) -> Self {
        self.lines.push(line(account_code, None, Side::Debit, amount));
        self
    }

    /// Adds a credit line against an account code
    pub fn credit(mut self, account_code: &str, amount: Decimal) -> Self {
        self.lines.push(line(account_code, None, Side::Credit, amount));
        self
    }

    /// Adds a partner-attributed debit line
    pub fn debit_partner(mut self, account_code: &str, partner_code: &str, amount: Decimal) -> Self {
        self.lines
            .push(line(account_code, Some(partner_code), Side::Debit, amount));
        self
    }

    /// Adds a partner-attributed credit line
    pub fn credit_partner(
        mut self,
        account_code: &str,
        partner_code: &str,
        amount: Decimal,
    ) -> Self {
        self.lines
            .push(line(account_code, Some(partner_code), Side::Credit, amount));
        self
    }

    pub fn build(self) -> VoucherInput {
        VoucherInput {
            date: self.date,
            number: None,
            description: self.description,
            lines: self.lines,
        }
    }
}

fn line(
    account_code: &str,
    partner_code: Option<&str>,
    side: Side,
    amount: Decimal,
) -> LineInput {
    LineInput {
        account_code: account_code.to_string(),
        partner_code: partner_code.map(str::to_string),
        side,
        amount,
        description: None,
        classification_code: None,
    }
}

/// Builder for trade voucher requests
pub struct TradeVoucherInputBuilder {
    date: NaiveDate,
    kind: TradeKind,
    partner_code: String,
    description: String,
    supply_value: Decimal,
    vat_amount: Decimal,
    lines: Vec<TradeLineInput>,
}

impl TradeVoucherInputBuilder {
    pub fn sale_on(date: NaiveDate, partner_code: &str) -> Self {
        Self::on(date, TradeKind::Sale, partner_code)
    }

    pub fn purchase_on(date: NaiveDate, partner_code: &str) -> Self {
        Self::on(date, TradeKind::Purchase, partner_code)
    }

    fn on(date: NaiveDate, kind: TradeKind, partner_code: &str) -> Self {
        Self {
            date,
            kind,
            partner_code: partner_code.to_string(),
            description: "test trade voucher".to_string(),
            supply_value: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            lines: Vec::new(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tax(mut self, supply_value: Decimal, vat_amount: Decimal) -> Self {
        self.supply_value = supply_value;
        self.vat_amount = vat_amount;
        self
    }

    pub fn debit(mut self, account_code: &str, amount: Decimal) -> Self {
        self.lines.push(trade_line(account_code, Side::Debit, amount));
        self
    }

    pub fn credit(mut self, account_code: &str, amount: Decimal) -> Self {
        self.lines.push(trade_line(account_code, Side::Credit, amount));
        self
    }

    pub fn build(self) -> TradeVoucherInput {
        TradeVoucherInput {
            date: self.date,
            number: None,
            kind: self.kind,
            partner_code: self.partner_code,
            description: self.description,
            supply_value: self.supply_value,
            vat_amount: self.vat_amount,
            lines: self.lines,
        }
    }
}

fn trade_line(account_code: &str, side: Side, amount: Decimal) -> TradeLineInput {
    TradeLineInput {
        account_code: account_code.to_string(),
        side,
        amount,
        description: None,
        classification_code: None,
    }
}
