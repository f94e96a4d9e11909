//! Money types with precise decimal arithmetic
//!
//! Monetary values use rust_decimal throughout; floating point never touches
//! ledger arithmetic. The system is single-currency (multi-currency bookkeeping
//! is out of scope), so `Money` wraps a bare `Decimal` rounded to two places.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use thiserror::Error;

/// Two balance totals are considered equal when they differ by less than one
/// hundredth of a currency unit. This is the tolerance used by the journal
/// validator and by the settlement engine's "near-zero" skip rule.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Errors that can occur constructing or combining money values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Decimal),
}

/// A monetary amount, stored to two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new amount, rounding to the currency's two decimal places
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(2))
    }

    /// A zero amount
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Creates an amount that must be non-negative (line amounts, balances)
    pub fn non_negative(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount(amount));
        }
        Ok(Self::new(amount))
    }

    /// Returns the inner decimal value
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True when the magnitude is below the ledger balance tolerance
    pub fn is_negligible(&self) -> bool {
        self.0.abs() < BALANCE_TOLERANCE
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

/// A balance presented on its net side: at most one of `debit`/`credit` is
/// non-zero. Carry-forward rows and report columns use this presentation
/// (net position, not gross turnover).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebitCredit {
    pub debit: Money,
    pub credit: Money,
}

impl DebitCredit {
    /// Splits a signed net (debit-positive) onto its natural side
    pub fn from_net(net: Decimal) -> Self {
        if net > Decimal::ZERO {
            Self {
                debit: Money::new(net),
                credit: Money::zero(),
            }
        } else {
            Self {
                debit: Money::zero(),
                credit: Money::new(-net),
            }
        }
    }

    /// Returns the signed net (debit minus credit)
    pub fn net(&self) -> Decimal {
        self.debit.amount() - self.credit.amount()
    }

    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounds_to_two_places() {
        // round_dp uses banker's rounding: ties go to the even cent
        assert_eq!(Money::new(dec!(100.005)).amount(), dec!(100.00));
        assert_eq!(Money::new(dec!(100.015)).amount(), dec!(100.02));
        assert_eq!(Money::new(dec!(100.009)).amount(), dec!(100.01));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100.00));
        let b = Money::new(dec!(50.00));

        assert_eq!((a + b).amount(), dec!(150.00));
        assert_eq!((a - b).amount(), dec!(50.00));
        assert_eq!((-a).amount(), dec!(-100.00));
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [dec!(1.10), dec!(2.20), dec!(3.30)]
            .into_iter()
            .map(Money::new)
            .sum();
        assert_eq!(total.amount(), dec!(6.60));
    }

    #[test]
    fn test_non_negative_rejects_negative() {
        assert!(Money::non_negative(dec!(-0.01)).is_err());
        assert!(Money::non_negative(dec!(0)).is_ok());
    }

    #[test]
    fn test_negligible_threshold() {
        assert!(Money::new(dec!(0.009)).is_negligible());
        assert!(!Money::new(dec!(0.01)).is_negligible());
        assert!(Money::new(dec!(-0.005)).is_negligible());
    }

    #[test]
    fn test_debit_credit_from_net() {
        let debit_side = DebitCredit::from_net(dec!(250));
        assert_eq!(debit_side.debit.amount(), dec!(250));
        assert!(debit_side.credit.is_zero());

        let credit_side = DebitCredit::from_net(dec!(-99.50));
        assert!(credit_side.debit.is_zero());
        assert_eq!(credit_side.credit.amount(), dec!(99.50));

        assert!(DebitCredit::from_net(Decimal::ZERO).is_zero());
    }

    #[test]
    fn test_debit_credit_net_round_trip() {
        let dc = DebitCredit::from_net(dec!(-1234.56));
        assert_eq!(dc.net(), dec!(-1234.56));
    }
}
