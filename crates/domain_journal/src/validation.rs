//! Business rule validation for voucher mutations
//!
//! Every mutating operation re-validates the full line set it would leave
//! behind: reference checks per line, then the double-entry balance check
//! over the whole set. Validation runs before any write; a failure leaves
//! no partial state.

use rust_decimal::Decimal;

use core_kernel::{CompanyId, Money, BALANCE_TOLERANCE};

use crate::account::Account;
use crate::error::JournalError;
use crate::partner::BusinessPartner;
use crate::voucher::Side;

/// Sums a line set into its debit and credit totals
pub fn balance_totals<I>(lines: I) -> (Money, Money)
where
    I: IntoIterator<Item = (Side, Money)>,
{
    let mut debits = Money::zero();
    let mut credits = Money::zero();
    for (side, amount) in lines {
        match side {
            Side::Debit => debits += amount,
            Side::Credit => credits += amount,
        }
    }
    (debits, credits)
}

/// Enforces the double-entry invariant over a full line set
///
/// # Errors
///
/// `Unbalanced` when the totals differ by the balance tolerance or more.
pub fn ensure_balanced(debits: Money, credits: Money) -> Result<(), JournalError> {
    if (debits.amount() - credits.amount()).abs() >= BALANCE_TOLERANCE {
        return Err(JournalError::Unbalanced {
            debits: debits.amount(),
            credits: credits.amount(),
        });
    }
    Ok(())
}

/// A line set must not be empty; an empty voucher is deleted, not stored
pub fn ensure_non_empty(line_count: usize) -> Result<(), JournalError> {
    if line_count == 0 {
        return Err(JournalError::EmptyLineSet);
    }
    Ok(())
}

/// Validates a raw line amount: positive, non-zero
pub fn ensure_amount(line_no: u32, amount: Decimal) -> Result<Money, JournalError> {
    if amount <= Decimal::ZERO {
        return Err(JournalError::InvalidAmount { line_no, amount });
    }
    Ok(Money::new(amount))
}

/// Validates that an account may be posted to by the given company
pub fn ensure_postable_account(
    account: &Account,
    company_id: CompanyId,
) -> Result<(), JournalError> {
    if account.company_id != company_id {
        return Err(JournalError::ForeignCompanyReference {
            entity: "Account",
            code: account.code.clone(),
        });
    }
    if !account.is_active {
        return Err(JournalError::AccountInactive {
            code: account.code.clone(),
        });
    }
    Ok(())
}

/// Validates that a partner may be referenced by the given company
pub fn ensure_postable_partner(
    partner: &BusinessPartner,
    company_id: CompanyId,
) -> Result<(), JournalError> {
    if partner.company_id != company_id {
        return Err(JournalError::ForeignCompanyReference {
            entity: "BusinessPartner",
            code: partner.code.clone(),
        });
    }
    if !partner.is_active {
        return Err(JournalError::PartnerInactive {
            code: partner.code.clone(),
        });
    }
    Ok(())
}
