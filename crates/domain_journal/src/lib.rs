//! Journal domain - transaction model and validator
//!
//! This crate owns the two voucher families (free-form general vouchers and
//! partner-bound trade vouchers), normalizes them into one line-oriented
//! posting view, and enforces the double-entry invariant - total debits equal
//! total credits within the balance tolerance - before anything is persisted.

pub mod account;
pub mod error;
pub mod numbering;
pub mod partner;
pub mod ports;
pub mod services;
pub mod validation;
pub mod voucher;

pub use account::{Account, AccountType, NormalSide, NET_INCOME_CODE, RETAINED_EARNINGS_CODE};
pub use error::JournalError;
pub use numbering::VoucherNumber;
pub use partner::BusinessPartner;
pub use ports::{ChartStore, JournalStore, NewGeneralVoucher, NewTradeVoucher, PostingQuery};
pub use services::{
    JournalService, LineDeletion, LineInput, TradeLineInput, TradeVoucherInput, VoucherInput,
    VoucherReceipt,
};
pub use voucher::{
    is_settlement_marked, GeneralLine, GeneralVoucher, Posting, Side, TradeKind, TradeLine,
    TradeVoucher, VoucherKind, SETTLEMENT_MARKER,
};
