//! Journal domain errors
//!
//! Validation failures reject the request before any write and are fully
//! recoverable by resubmitting corrected input. Storage failures bubble up
//! from the port layer; the unit of work they interrupted is never partially
//! committed.

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{PortError, VoucherId};

use crate::numbering::VoucherNumberError;

/// Errors that can occur in the journal domain
#[derive(Debug, Error)]
pub enum JournalError {
    /// The line set does not balance within the tolerance
    #[error("Unbalanced transaction: debits={debits}, credits={credits}")]
    Unbalanced { debits: Decimal, credits: Decimal },

    /// A voucher must carry at least one line
    #[error("Transaction has no lines")]
    EmptyLineSet,

    /// Line amounts must be positive; the side carries the direction
    #[error("Line {line_no}: amount must be a positive value, got {amount}")]
    InvalidAmount { line_no: u32, amount: Decimal },

    #[error("Account '{code}' does not exist")]
    AccountNotFound { code: String },

    #[error("Account '{code}' is inactive and cannot be posted to")]
    AccountInactive { code: String },

    #[error("Business partner '{code}' does not exist")]
    PartnerNotFound { code: String },

    #[error("Business partner '{code}' is inactive and cannot be referenced")]
    PartnerInactive { code: String },

    /// Referenced entity belongs to a different company
    #[error("{entity} '{code}' belongs to another company")]
    ForeignCompanyReference { entity: &'static str, code: String },

    #[error("Transaction {0} does not exist")]
    VoucherNotFound(VoucherId),

    #[error("Transaction {voucher_id} has no line {line_no}")]
    LineNotFound { voucher_id: VoucherId, line_no: u32 },

    #[error(transparent)]
    Number(#[from] VoucherNumberError),

    #[error(transparent)]
    Storage(#[from] PortError),
}

impl JournalError {
    /// True for errors the caller can fix by resubmitting corrected input
    pub fn is_validation(&self) -> bool {
        !matches!(self, JournalError::Storage(_))
    }
}
