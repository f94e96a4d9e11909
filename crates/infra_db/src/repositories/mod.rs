//! Port implementations for [`PgStore`](crate::store::PgStore)
//!
//! One module per domain port: chart reads, journal storage, closing
//! storage. Text-encoded enums (sides, account types, voucher kinds) are
//! decoded here; a value that fails to decode is a corrupt row surfaced as
//! an internal port error, never a panic.

pub mod chart;
pub mod closing;
pub mod journal;

use core_kernel::PortError;
use domain_journal::{AccountType, Side, TradeKind, VoucherNumber};

use crate::error::DatabaseError;

pub(crate) fn side_to_str(side: Side) -> &'static str {
    match side {
        Side::Debit => "DEBIT",
        Side::Credit => "CREDIT",
    }
}

pub(crate) fn side_from_str(value: &str) -> Result<Side, PortError> {
    match value {
        "DEBIT" => Ok(Side::Debit),
        "CREDIT" => Ok(Side::Credit),
        other => Err(corrupt(format!("unknown posting side '{other}'"))),
    }
}

pub(crate) fn account_type_from_str(value: &str) -> Result<AccountType, PortError> {
    match value {
        "ASSET" => Ok(AccountType::Asset),
        "LIABILITY" => Ok(AccountType::Liability),
        "EQUITY" => Ok(AccountType::Equity),
        "REVENUE" => Ok(AccountType::Revenue),
        "EXPENSE" => Ok(AccountType::Expense),
        other => Err(corrupt(format!("unknown account type '{other}'"))),
    }
}

pub(crate) fn trade_kind_to_str(kind: TradeKind) -> &'static str {
    match kind {
        TradeKind::Sale => "SALE",
        TradeKind::Purchase => "PURCHASE",
    }
}

pub(crate) fn trade_kind_from_str(value: &str) -> Result<TradeKind, PortError> {
    match value {
        "SALE" => Ok(TradeKind::Sale),
        "PURCHASE" => Ok(TradeKind::Purchase),
        other => Err(corrupt(format!("unknown trade voucher kind '{other}'"))),
    }
}

pub(crate) fn voucher_number_from_str(value: &str) -> Result<VoucherNumber, PortError> {
    value
        .parse()
        .map_err(|_| corrupt(format!("malformed voucher number '{value}'")))
}

pub(crate) fn corrupt(message: String) -> PortError {
    DatabaseError::CorruptRow(message).into()
}
