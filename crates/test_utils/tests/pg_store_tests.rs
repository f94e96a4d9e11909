//! Live-PostgreSQL integration tests
//!
//! Exercise the real store adapter against a disposable Postgres container.
//! Ignored by default; run with `cargo test -- --ignored` on a machine with
//! Docker available.

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::FiscalYear;
use domain_journal::{JournalService, JournalStore, PostingQuery};
use domain_ledger::{ClosingService, ClosingStore, LedgerQuery, LedgerService};
use test_utils::database::shared_test_database;
use test_utils::fixtures::date;
use test_utils::{CompanyFixture, VoucherInputBuilder};

/// Inserts the fixture's reference data with raw SQL; accounts and partners
/// are owned by an external service in production
async fn seed_reference_data(
    pool: &sqlx::PgPool,
    fixture: &CompanyFixture,
) -> Result<(), sqlx::Error> {
    for account in &fixture.accounts {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, company_id, account_code, account_name, account_type, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            "#,
        )
        .bind(Uuid::from(account.id))
        .bind(Uuid::from(account.company_id))
        .bind(&account.code)
        .bind(&account.name)
        .bind(format!("{:?}", account.account_type).to_uppercase())
        .execute(pool)
        .await?;
    }
    for partner in &fixture.partners {
        sqlx::query(
            r#"
            INSERT INTO business_partners (partner_id, company_id, partner_code, partner_name, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            "#,
        )
        .bind(Uuid::from(partner.id))
        .bind(Uuid::from(partner.company_id))
        .bind(&partner.code)
        .bind(&partner.name)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_period(pool: &sqlx::PgPool, fixture: &CompanyFixture) -> Result<(), sqlx::Error> {
    let period = fixture.calendar_period(1, 2024);
    sqlx::query(
        r#"
        INSERT INTO fiscal_periods (period_id, company_id, fiscal_year, start_date, end_date, is_closed)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        "#,
    )
    .bind(Uuid::from(period.id))
    .bind(Uuid::from(period.company_id))
    .bind(period.fiscal_year.value())
    .bind(period.start_date)
    .bind(period.end_date)
    .execute(pool)
    .await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn full_fiscal_cycle_against_postgres() {
    let db = shared_test_database().await;
    let fixture = CompanyFixture::standard();
    seed_reference_data(db.pool(), &fixture).await.unwrap();
    seed_period(db.pool(), &fixture).await.unwrap();

    let store = Arc::new(db.store());
    let journal = JournalService::new(store.clone());
    let ledger = LedgerService::new(store.clone());
    let closing = ClosingService::new(store.clone());

    // Post a sale, read it back through the unified posting view
    let sale = VoucherInputBuilder::on(date(2024, 8, 10))
        .described("cash sale")
        .debit("101", dec!(500_000))
        .credit("401", dec!(500_000))
        .build();
    let receipt = journal.create_general(fixture.company_id, sale).await.unwrap();
    assert_eq!(receipt.number.to_string(), "20240810-001");

    let postings = store
        .postings(fixture.company_id, PostingQuery::default())
        .await
        .unwrap();
    assert_eq!(postings.len(), 2);

    // Settle and carry forward
    closing.settle_income(fixture.company_id, 1).await.unwrap();
    let summary = closing.carry_forward(fixture.company_id, 1).await.unwrap();
    assert_eq!(summary.accounts_carried, 2);

    // Year 2 was created and opens with the carried balances
    let next = store
        .period(fixture.company_id, FiscalYear::new(2).unwrap())
        .await
        .unwrap()
        .expect("year 2 exists");
    assert_eq!(next.start_date, date(2025, 1, 1));

    let view = ledger
        .ledger(
            fixture.company_id,
            LedgerQuery {
                account_code: "101".to_string(),
                partner_code: None,
                fiscal_year: Some(2),
                range: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(view.opening, dec!(500_000));

    // Re-running the closing replaces its own output
    let again = closing.carry_forward(fixture.company_id, 1).await.unwrap();
    assert_eq!(again.accounts_carried, summary.accounts_carried);
}
