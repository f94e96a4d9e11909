//! Closing and report tests against the in-memory store
//!
//! Covers the full fiscal cycle: postings, ledgers, income settlement,
//! retained-earnings settlement, carry-forward, and the derived statements,
//! including idempotence of every re-runnable step.

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{DateRange, DebitCredit, FiscalYear};
use domain_journal::{JournalService, RETAINED_EARNINGS_CODE, SETTLEMENT_MARKER};
use domain_ledger::{
    CarryForwardBalance, ClosingService, ClosingStore, LedgerError, LedgerQuery, LedgerService,
    RETAINED_EARNINGS_DESCRIPTION, REVENUE_SWEEP_DESCRIPTION,
};
use test_utils::fixtures::date;
use test_utils::{
    assert_net_presentation, assert_running_balance_consistent, assert_trial_balance_reconciles,
    CompanyFixture, MemoryStore, VoucherInputBuilder,
};

struct Harness {
    store: Arc<MemoryStore>,
    fixture: CompanyFixture,
    journal: JournalService<MemoryStore>,
    ledger: LedgerService<MemoryStore>,
    closing: ClosingService<MemoryStore>,
}

/// Fixture company with a year-1 period covering calendar 2024
fn harness() -> Harness {
    let fixture = CompanyFixture::standard();
    let store = Arc::new(MemoryStore::new());
    for account in &fixture.accounts {
        store.seed_account(account.clone());
    }
    for partner in &fixture.partners {
        store.seed_partner(partner.clone());
    }
    store.seed_period(fixture.calendar_period(1, 2024));
    Harness {
        journal: JournalService::new(store.clone()),
        ledger: LedgerService::new(store.clone()),
        closing: ClosingService::new(store.clone()),
        store,
        fixture,
    }
}

/// Seeds the canonical scenario: opening cash 1,000,000 against capital
/// 1,000,000, then one sale posting debit 101 / credit 401 of 500,000
async fn seed_opening_and_sale(h: &Harness) {
    h.store.seed_carry_forward(CarryForwardBalance {
        company_id: h.fixture.company_id,
        fiscal_year: FiscalYear::new(1).unwrap(),
        account_id: h.fixture.account("101").id,
        partner_id: None,
        balance: DebitCredit::from_net(dec!(1_000_000)),
    });
    h.store.seed_carry_forward(CarryForwardBalance {
        company_id: h.fixture.company_id,
        fiscal_year: FiscalYear::new(1).unwrap(),
        account_id: h.fixture.account("301").id,
        partner_id: None,
        balance: DebitCredit::from_net(dec!(-1_000_000)),
    });

    let sale = VoucherInputBuilder::on(date(2024, 8, 10))
        .described("cash sale")
        .debit("101", dec!(500_000))
        .credit("401", dec!(500_000))
        .build();
    h.journal
        .create_general(h.fixture.company_id, sale)
        .await
        .unwrap();
}

fn account_query(code: &str, year: Option<i32>) -> LedgerQuery {
    LedgerQuery {
        account_code: code.to_string(),
        partner_code: None,
        fiscal_year: year,
        range: None,
    }
}

// ============================================================================
// Ledger builder
// ============================================================================

#[tokio::test]
async fn ledger_folds_opening_into_running_balance() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    let view = h
        .ledger
        .ledger(h.fixture.company_id, account_query("101", Some(1)))
        .await
        .unwrap();

    assert_eq!(view.opening, dec!(1_000_000));
    assert!(view.rows[0].carried_forward);
    assert_eq!(view.closing, dec!(1_500_000));
    assert_running_balance_consistent(&view);
}

#[tokio::test]
async fn dormant_account_yields_an_empty_ledger() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    let view = h
        .ledger
        .ledger(h.fixture.company_id, account_query("502", Some(1)))
        .await
        .unwrap();
    assert!(view.rows.is_empty());
    assert_eq!(view.closing, dec!(0));

    // ...and is omitted from the summary list
    let summaries = h
        .ledger
        .summary(h.fixture.company_id, Some(1), None)
        .await
        .unwrap();
    assert!(summaries.iter().all(|s| s.account_code != "502"));
}

#[tokio::test]
async fn mid_period_window_folds_pre_window_turnover_into_opening() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    // An extra February expense, before the queried window
    let february = VoucherInputBuilder::on(date(2024, 2, 20))
        .debit("501", dec!(80_000))
        .credit("101", dec!(80_000))
        .build();
    h.journal
        .create_general(h.fixture.company_id, february)
        .await
        .unwrap();

    let windowed = LedgerQuery {
        account_code: "101".to_string(),
        partner_code: None,
        fiscal_year: Some(1),
        range: Some(DateRange::new(date(2024, 6, 1), date(2024, 12, 31)).unwrap()),
    };
    let view = h.ledger.ledger(h.fixture.company_id, windowed).await.unwrap();

    // Opening = 1,000,000 carry-forward - 80,000 pre-window credit
    assert_eq!(view.opening, dec!(920_000));
    // Only the August sale is inside the window
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.closing, dec!(1_420_000));

    // Summary uses the identical resolution
    let summaries = h
        .ledger
        .summary(
            h.fixture.company_id,
            Some(1),
            Some(DateRange::new(date(2024, 6, 1), date(2024, 12, 31)).unwrap()),
        )
        .await
        .unwrap();
    let cash = summaries.iter().find(|s| s.account_code == "101").unwrap();
    assert_eq!(cash.opening.net(), dec!(920_000));
    assert_eq!(cash.closing.net(), view.closing);
}

#[tokio::test]
async fn partner_sub_ledger_tracks_the_pair_key() {
    let h = harness();
    let credit_sale = VoucherInputBuilder::on(date(2024, 9, 1))
        .debit_partner("110", "00001", dec!(330_000))
        .credit("401", dec!(330_000))
        .build();
    h.journal
        .create_general(h.fixture.company_id, credit_sale)
        .await
        .unwrap();

    let query = LedgerQuery {
        account_code: "110".to_string(),
        partner_code: Some("00001".to_string()),
        fiscal_year: Some(1),
        range: None,
    };
    let view = h.ledger.ledger(h.fixture.company_id, query).await.unwrap();
    assert_eq!(view.closing, dec!(330_000));

    let summaries = h
        .ledger
        .partner_summary(h.fixture.company_id, "110", Some(1), None)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].partner_code, "00001");
    assert_eq!(summaries[0].closing.net(), dec!(330_000));
}

// ============================================================================
// Income settlement
// ============================================================================

#[tokio::test]
async fn income_settlement_sweeps_revenue_into_net_income() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    let outcome = h
        .closing
        .settle_income(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_eq!(outcome.vouchers_created.len(), 1);

    // One generated voucher: debit 401 / credit 998, 500,000 each
    let sweeps = h.store.general_vouchers_described(REVENUE_SWEEP_DESCRIPTION);
    assert_eq!(sweeps.len(), 1);
    assert_eq!(sweeps[0].date, date(2024, 12, 31));
    assert!(sweeps[0].is_balanced());
    assert_eq!(sweeps[0].total_debit.amount(), dec!(500_000));

    // Net income now carries the credit balance
    let net_income = h
        .ledger
        .ledger(h.fixture.company_id, account_query("998", Some(1)))
        .await
        .unwrap();
    assert_eq!(net_income.closing, dec!(-500_000));

    // The revenue account is zeroed
    let sales = h
        .ledger
        .ledger(h.fixture.company_id, account_query("401", Some(1)))
        .await
        .unwrap();
    assert_eq!(sales.closing, dec!(0));
}

#[tokio::test]
async fn income_settlement_is_idempotent() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    let first = h
        .ledger
        .ledger(h.fixture.company_id, account_query("998", Some(1)))
        .await
        .unwrap()
        .closing;

    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    let second = h
        .ledger
        .ledger(h.fixture.company_id, account_query("998", Some(1)))
        .await
        .unwrap()
        .closing;

    assert_eq!(first, second);
    assert_eq!(first, dec!(-500_000));
    // Cleanup-and-recreate leaves exactly one marked voucher
    assert_eq!(
        h.store.general_vouchers_described(SETTLEMENT_MARKER).len(),
        1
    );
}

#[tokio::test]
async fn income_settlement_with_no_activity_is_a_noop() {
    let h = harness();
    let outcome = h
        .closing
        .settle_income(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert!(outcome.vouchers_created.is_empty());
    assert_eq!(h.store.general_voucher_count(), 0);
}

#[tokio::test]
async fn income_settlement_builds_consolidated_expense_voucher() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    let wages = VoucherInputBuilder::on(date(2024, 10, 5))
        .debit("501", dec!(120_000))
        .credit("101", dec!(120_000))
        .build();
    let rent = VoucherInputBuilder::on(date(2024, 10, 6))
        .debit("502", dec!(60_000))
        .credit("101", dec!(60_000))
        .build();
    h.journal.create_general(h.fixture.company_id, wages).await.unwrap();
    h.journal.create_general(h.fixture.company_id, rent).await.unwrap();

    let outcome = h
        .closing
        .settle_income(h.fixture.company_id, 1)
        .await
        .unwrap();
    // One revenue sweep + one consolidated expense sweep
    assert_eq!(outcome.vouchers_created.len(), 2);

    let net_income = h
        .ledger
        .ledger(h.fixture.company_id, account_query("998", Some(1)))
        .await
        .unwrap();
    assert_eq!(net_income.closing, dec!(-320_000));
}

// ============================================================================
// Retained-earnings settlement
// ============================================================================

#[tokio::test]
async fn retained_earnings_requires_income_settlement_first() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    let err = h
        .closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 15), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::PriorSettlementRequired { year: 1 }
    ));
    assert!(err.is_state_error());
}

#[tokio::test]
async fn retained_earnings_moves_net_income_and_persists_disposal_dates() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();

    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 15), None)
        .await
        .unwrap();

    let disposals = h
        .store
        .general_vouchers_described(RETAINED_EARNINGS_DESCRIPTION);
    assert_eq!(disposals.len(), 1);
    assert_eq!(disposals[0].date, date(2025, 3, 15));
    assert_eq!(disposals[0].total_debit.amount(), dec!(500_000));

    let period = h
        .store
        .period(h.fixture.company_id, FiscalYear::new(1).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(period.current_disposal_date, Some(date(2025, 3, 15)));
    assert_eq!(period.previous_disposal_date, None);

    // Re-running replaces the disposal voucher instead of stacking
    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 20), None)
        .await
        .unwrap();
    let disposals = h
        .store
        .general_vouchers_described(RETAINED_EARNINGS_DESCRIPTION);
    assert_eq!(disposals.len(), 1);
    assert_eq!(disposals[0].date, date(2025, 3, 20));
}

#[tokio::test]
async fn in_period_disposal_date_still_rerunnable() {
    // A disposal dated at the period end sits inside the queried window;
    // the re-run must not count its own prior voucher as a zeroed balance
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();

    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2024, 12, 31), None)
        .await
        .unwrap();
    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2024, 12, 31), None)
        .await
        .unwrap();

    let disposals = h
        .store
        .general_vouchers_described(RETAINED_EARNINGS_DESCRIPTION);
    assert_eq!(disposals.len(), 1);
    assert_eq!(disposals[0].total_debit.amount(), dec!(500_000));

    // With the disposal inside the period, 999 absorbs it in year 1 already
    let retained = h
        .ledger
        .ledger(
            h.fixture.company_id,
            account_query(RETAINED_EARNINGS_CODE, Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(retained.closing, dec!(-500_000));
}

#[tokio::test]
async fn second_fiscal_year_requires_previous_disposal_date() {
    let h = harness();
    h.store.seed_period(h.fixture.calendar_period(2, 2025));
    let sale = VoucherInputBuilder::on(date(2025, 4, 2))
        .debit("101", dec!(50_000))
        .credit("401", dec!(50_000))
        .build();
    h.journal.create_general(h.fixture.company_id, sale).await.unwrap();
    h.closing.settle_income(h.fixture.company_id, 2).await.unwrap();

    let err = h
        .closing
        .settle_retained_earnings(h.fixture.company_id, 2, date(2026, 3, 15), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::MissingPreviousDisposalDate { year: 2 }
    ));

    h.closing
        .settle_retained_earnings(
            h.fixture.company_id,
            2,
            date(2026, 3, 15),
            Some(date(2025, 3, 15)),
        )
        .await
        .unwrap();
}

// ============================================================================
// Carry-forward
// ============================================================================

#[tokio::test]
async fn carry_forward_carries_balance_sheet_accounts_only() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 15), None)
        .await
        .unwrap();

    let summary = h
        .closing
        .carry_forward(h.fixture.company_id, 1)
        .await
        .unwrap();

    // Cash, capital, and the swept net income carry; revenue does not
    assert_eq!(summary.accounts_carried, 3);
    assert_eq!(summary.partners_carried, 0);

    let rows: Vec<CarryForwardBalance> = h
        .store
        .carry_forward_snapshot()
        .into_iter()
        .filter(|r| r.fiscal_year == FiscalYear::new(2).unwrap())
        .collect();

    let cash = rows
        .iter()
        .find(|r| r.account_id == h.fixture.account("101").id)
        .unwrap();
    assert_eq!(cash.balance.debit.amount(), dec!(1_500_000));
    assert!(cash.balance.credit.is_zero());

    // Account 401 (revenue) produces no row
    assert!(!rows
        .iter()
        .any(|r| r.account_id == h.fixture.account("401").id));

    // The disposal voucher is dated into year 2, so 998 still carries its
    // year-1 credit; everything stays in net presentation
    let net_income = rows
        .iter()
        .find(|r| r.account_id == h.fixture.account("998").id)
        .unwrap();
    assert_eq!(net_income.balance.credit.amount(), dec!(500_000));
    for row in &rows {
        assert_net_presentation(row);
    }
}

#[tokio::test]
async fn carry_forward_is_idempotent() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();

    let first = h
        .closing
        .carry_forward(h.fixture.company_id, 1)
        .await
        .unwrap();
    let snapshot_one = h.store.carry_forward_snapshot();

    let second = h
        .closing
        .carry_forward(h.fixture.company_id, 1)
        .await
        .unwrap();
    let snapshot_two = h.store.carry_forward_snapshot();

    assert_eq!(first.accounts_carried, second.accounts_carried);
    assert_eq!(snapshot_one.len(), snapshot_two.len());
    for (a, b) in snapshot_one.iter().zip(snapshot_two.iter()) {
        assert_eq!(a.account_id, b.account_id);
        assert_eq!(a.balance, b.balance);
    }
}

#[tokio::test]
async fn carry_forward_creates_the_next_period_when_missing() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    h.closing.carry_forward(h.fixture.company_id, 1).await.unwrap();

    let next = h
        .store
        .period(h.fixture.company_id, FiscalYear::new(2).unwrap())
        .await
        .unwrap()
        .expect("year 2 should have been created");
    assert_eq!(next.start_date, date(2025, 1, 1));
    assert_eq!(next.end_date, date(2025, 12, 31));
    assert!(!next.closed);
}

#[tokio::test]
async fn carry_forward_from_a_missing_period_is_a_state_error() {
    let h = harness();
    let err = h
        .closing
        .carry_forward(h.fixture.company_id, 7)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PeriodNotFound { year: 7 }));
}

#[tokio::test]
async fn carry_forward_builds_partner_sub_ledger_rows() {
    let h = harness();
    let credit_sale = VoucherInputBuilder::on(date(2024, 9, 1))
        .debit_partner("110", "00001", dec!(330_000))
        .credit("401", dec!(330_000))
        .build();
    h.journal
        .create_general(h.fixture.company_id, credit_sale)
        .await
        .unwrap();

    let summary = h
        .closing
        .carry_forward(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_eq!(summary.partners_carried, 1);

    let pair_row = h
        .store
        .carry_forward_snapshot()
        .into_iter()
        .find(|r| r.partner_id.is_some())
        .unwrap();
    assert_eq!(pair_row.account_id, h.fixture.account("110").id);
    assert_eq!(pair_row.partner_id, Some(h.fixture.partner("00001").id));
    assert_eq!(pair_row.balance.debit.amount(), dec!(330_000));

    // The pair opening then feeds year-2 sub-ledger reads
    let query = LedgerQuery {
        account_code: "110".to_string(),
        partner_code: Some("00001".to_string()),
        fiscal_year: Some(2),
        range: None,
    };
    let view = h.ledger.ledger(h.fixture.company_id, query).await.unwrap();
    assert_eq!(view.opening, dec!(330_000));
}

// ============================================================================
// Period close / reopen
// ============================================================================

#[tokio::test]
async fn close_and_reopen_are_state_checked() {
    let h = harness();

    h.closing.close_period(h.fixture.company_id, 1).await.unwrap();
    let err = h
        .closing
        .close_period(h.fixture.company_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PeriodAlreadyClosed { year: 1 }));

    h.closing.reopen_period(h.fixture.company_id, 1).await.unwrap();
    let err = h
        .closing
        .reopen_period(h.fixture.company_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PeriodNotClosed { year: 1 }));
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn income_statement_reports_net_turnover_excluding_settlement() {
    let h = harness();
    seed_opening_and_sale(&h).await;

    let before = h
        .ledger
        .income_statement(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_eq!(before.total_revenue, dec!(500_000));
    assert_eq!(before.net_income, dec!(500_000));

    // Settlement vouchers do not distort the statement
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    let after = h
        .ledger
        .income_statement(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_eq!(after.total_revenue, dec!(500_000));
    assert_eq!(after.net_income, dec!(500_000));
}

#[tokio::test]
async fn trial_balance_and_balance_sheet_round_trip_after_closing() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 15), None)
        .await
        .unwrap();

    let trial = h
        .ledger
        .trial_balance(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_trial_balance_reconciles(&trial);
    assert_eq!(trial.total_closing_debit.amount(), dec!(1_500_000));

    let sheet = h
        .ledger
        .balance_sheet(h.fixture.company_id, 1)
        .await
        .unwrap();
    assert_eq!(sheet.total_assets, trial.total_closing_debit.amount());
    assert_eq!(
        sheet.total_liabilities + sheet.total_equity,
        trial.total_closing_credit.amount()
    );
    assert_eq!(sheet.total_assets, sheet.total_liabilities + sheet.total_equity);
}

#[tokio::test]
async fn retained_earnings_control_account_absorbs_the_next_year() {
    let h = harness();
    seed_opening_and_sale(&h).await;
    h.closing.settle_income(h.fixture.company_id, 1).await.unwrap();
    h.closing
        .settle_retained_earnings(h.fixture.company_id, 1, date(2025, 3, 15), None)
        .await
        .unwrap();
    h.closing.carry_forward(h.fixture.company_id, 1).await.unwrap();

    // Within year 2, the disposal voucher moves 998 into 999
    let retained = h
        .ledger
        .ledger(
            h.fixture.company_id,
            account_query(RETAINED_EARNINGS_CODE, Some(2)),
        )
        .await
        .unwrap();
    assert_eq!(retained.closing, dec!(-500_000));

    let net_income = h
        .ledger
        .ledger(h.fixture.company_id, account_query("998", Some(2)))
        .await
        .unwrap();
    // Year-2 opening credit 500,000 cancelled by the disposal debit
    assert_eq!(net_income.closing, dec!(0));
}
