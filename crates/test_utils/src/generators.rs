//! Property-based test data generators

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Money;
use domain_journal::Side;

/// Strategy producing positive two-decimal amounts
pub fn amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..=1_000_000_00).prop_map(|cents| Money::new(Decimal::new(cents, 2)))
}

/// Strategy producing a balanced line set: N debit amounts mirrored by one
/// credit of the sum, shuffled sides flipped half the time
pub fn balanced_lines_strategy() -> impl Strategy<Value = Vec<(Side, Money)>> {
    (prop::collection::vec(amount_strategy(), 1..6), any::<bool>()).prop_map(
        |(amounts, flipped)| {
            let total: Money = amounts.iter().copied().sum();
            let (many, one) = if flipped {
                (Side::Credit, Side::Debit)
            } else {
                (Side::Debit, Side::Credit)
            };
            let mut lines: Vec<(Side, Money)> =
                amounts.into_iter().map(|amount| (many, amount)).collect();
            lines.push((one, total));
            lines
        },
    )
}
