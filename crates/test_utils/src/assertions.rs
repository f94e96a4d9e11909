//! Custom assertion helpers for domain types

use domain_ledger::{CarryForwardBalance, LedgerView, TrialBalance};
use rust_decimal::Decimal;

/// Asserts that a trial balance's closing columns reconcile
pub fn assert_trial_balance_reconciles(trial: &TrialBalance) {
    assert!(
        trial.is_balanced,
        "trial balance closing columns diverge: debit {} vs credit {}",
        trial.total_closing_debit, trial.total_closing_credit
    );
}

/// Asserts the net presentation invariant: a carry-forward row never
/// carries both sides
pub fn assert_net_presentation(row: &CarryForwardBalance) {
    assert!(
        row.balance.debit.is_zero() || row.balance.credit.is_zero(),
        "carry-forward row for account {} carries both sides",
        row.account_id
    );
}

/// Asserts that each ledger row's running balance follows from the previous
/// one by exactly the row's signed amount
pub fn assert_running_balance_consistent(view: &LedgerView) {
    let mut expected = Decimal::ZERO;
    for row in &view.rows {
        if row.carried_forward {
            expected = row.running_balance;
            continue;
        }
        let signed = match row.side {
            domain_journal::Side::Debit => row.amount.amount(),
            domain_journal::Side::Credit => -row.amount.amount(),
        };
        expected += signed;
        assert_eq!(
            row.running_balance, expected,
            "running balance broke at voucher {:?}",
            row.reference
        );
    }
    assert_eq!(view.closing, expected, "closing differs from last row");
}
