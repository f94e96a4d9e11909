//! Closing storage on PostgreSQL
//!
//! Carry-forward and settlement plans apply as single transactions guarded
//! by per-company advisory locks, so two callers closing the same fiscal
//! period serialize instead of interleaving the delete-and-reinsert.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{
    AccountId, CompanyId, DebitCredit, FiscalYear, Money, PartnerId, PeriodId, PortError,
};
use domain_journal::{GeneralLine, VoucherNumber, SETTLEMENT_MARKER};
use domain_ledger::{
    CarryForwardBalance, CarryForwardPlan, ClosingStore, FiscalPeriod, SettlementCleanup,
    SettlementPlan,
};

use crate::error::port_err;
use crate::repositories::{corrupt, journal::insert_general_in_tx};
use crate::store::PgStore;

#[derive(Debug, FromRow)]
struct PeriodRow {
    period_id: Uuid,
    company_id: Uuid,
    fiscal_year: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_closed: bool,
    current_disposal_date: Option<NaiveDate>,
    previous_disposal_date: Option<NaiveDate>,
}

impl PeriodRow {
    fn into_domain(self) -> Result<FiscalPeriod, PortError> {
        let fiscal_year = FiscalYear::new(self.fiscal_year)
            .map_err(|_| corrupt(format!("invalid fiscal year {}", self.fiscal_year)))?;
        Ok(FiscalPeriod {
            id: PeriodId::from(self.period_id),
            company_id: CompanyId::from(self.company_id),
            fiscal_year,
            start_date: self.start_date,
            end_date: self.end_date,
            closed: self.is_closed,
            current_disposal_date: self.current_disposal_date,
            previous_disposal_date: self.previous_disposal_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct CarryForwardRow {
    company_id: Uuid,
    fiscal_year: i32,
    account_id: Uuid,
    partner_id: Option<Uuid>,
    debit_balance: Decimal,
    credit_balance: Decimal,
}

impl CarryForwardRow {
    fn into_domain(self) -> Result<CarryForwardBalance, PortError> {
        let fiscal_year = FiscalYear::new(self.fiscal_year)
            .map_err(|_| corrupt(format!("invalid fiscal year {}", self.fiscal_year)))?;
        Ok(CarryForwardBalance {
            company_id: CompanyId::from(self.company_id),
            fiscal_year,
            account_id: AccountId::from(self.account_id),
            partner_id: self.partner_id.map(PartnerId::from),
            balance: DebitCredit {
                debit: Money::new(self.debit_balance),
                credit: Money::new(self.credit_balance),
            },
        })
    }
}

/// Serializes closing operations per company and fiscal year
async fn lock_closing(
    tx: &mut Transaction<'_, Postgres>,
    scope: &str,
    company_id: Uuid,
    fiscal_year: i32,
) -> Result<(), PortError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{scope}:{company_id}:{fiscal_year}"))
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    Ok(())
}

#[async_trait]
impl ClosingStore for PgStore {
    async fn period(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Option<FiscalPeriod>, PortError> {
        let row: Option<PeriodRow> = sqlx::query_as(
            r#"
            SELECT period_id, company_id, fiscal_year, start_date, end_date,
                   is_closed, current_disposal_date, previous_disposal_date
            FROM fiscal_periods
            WHERE company_id = $1 AND fiscal_year = $2
            "#,
        )
        .bind(Uuid::from(company_id))
        .bind(fiscal_year.value())
        .fetch_optional(self.pool())
        .await
        .map_err(port_err)?;
        row.map(PeriodRow::into_domain).transpose()
    }

    async fn update_period(&self, period: &FiscalPeriod) -> Result<(), PortError> {
        let updated = sqlx::query(
            r#"
            UPDATE fiscal_periods
            SET is_closed = $1, current_disposal_date = $2, previous_disposal_date = $3
            WHERE company_id = $4 AND fiscal_year = $5
            "#,
        )
        .bind(period.closed)
        .bind(period.current_disposal_date)
        .bind(period.previous_disposal_date)
        .bind(Uuid::from(period.company_id))
        .bind(period.fiscal_year.value())
        .execute(self.pool())
        .await
        .map_err(port_err)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::not_found("FiscalPeriod", period.fiscal_year));
        }
        Ok(())
    }

    async fn carry_forward_rows(
        &self,
        company_id: CompanyId,
        fiscal_year: FiscalYear,
    ) -> Result<Vec<CarryForwardBalance>, PortError> {
        let rows: Vec<CarryForwardRow> = sqlx::query_as(
            r#"
            SELECT company_id, fiscal_year, account_id, partner_id,
                   debit_balance, credit_balance
            FROM carry_forward_balances
            WHERE company_id = $1 AND fiscal_year = $2
            "#,
        )
        .bind(Uuid::from(company_id))
        .bind(fiscal_year.value())
        .fetch_all(self.pool())
        .await
        .map_err(port_err)?;
        rows.into_iter().map(CarryForwardRow::into_domain).collect()
    }

    async fn apply_carry_forward(&self, plan: &CarryForwardPlan) -> Result<(), PortError> {
        let company = Uuid::from(plan.company_id);
        let mut tx = self.pool().begin().await.map_err(port_err)?;
        lock_closing(&mut tx, "carry_forward", company, plan.target_year.value()).await?;

        if let Some(period) = &plan.create_period {
            sqlx::query(
                r#"
                INSERT INTO fiscal_periods (period_id, company_id, fiscal_year, start_date, end_date, is_closed)
                VALUES ($1, $2, $3, $4, $5, FALSE)
                ON CONFLICT (company_id, fiscal_year) DO NOTHING
                "#,
            )
            .bind(Uuid::from(period.id))
            .bind(company)
            .bind(period.fiscal_year.value())
            .bind(period.start_date)
            .bind(period.end_date)
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
        }

        let deleted = sqlx::query(
            "DELETE FROM carry_forward_balances WHERE company_id = $1 AND fiscal_year = $2",
        )
        .bind(company)
        .bind(plan.target_year.value())
        .execute(&mut *tx)
        .await
        .map_err(port_err)?;
        debug!(
            company = %plan.company_id,
            year = plan.target_year.value(),
            replaced = deleted.rows_affected(),
            "carry-forward rows replaced"
        );

        for row in &plan.rows {
            sqlx::query(
                r#"
                INSERT INTO carry_forward_balances (
                    balance_id, company_id, fiscal_year, account_id, partner_id,
                    debit_balance, credit_balance
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(company)
            .bind(row.fiscal_year.value())
            .bind(Uuid::from(row.account_id))
            .bind(row.partner_id.map(Uuid::from))
            .bind(row.balance.debit.amount())
            .bind(row.balance.credit.amount())
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
        }

        tx.commit().await.map_err(port_err)?;
        Ok(())
    }

    async fn apply_settlement(
        &self,
        plan: &SettlementPlan,
    ) -> Result<Vec<VoucherNumber>, PortError> {
        let company = Uuid::from(plan.company_id);
        let mut tx = self.pool().begin().await.map_err(port_err)?;
        lock_closing(&mut tx, "settlement", company, 0).await?;

        match &plan.cleanup {
            SettlementCleanup::AllMarked => {
                sqlx::query(
                    "DELETE FROM general_vouchers WHERE company_id = $1 AND description LIKE $2",
                )
                .bind(company)
                .bind(format!("{SETTLEMENT_MARKER}%"))
                .execute(&mut *tx)
                .await
                .map_err(port_err)?;
            }
            SettlementCleanup::ExactDescription(description) => {
                sqlx::query(
                    "DELETE FROM general_vouchers WHERE company_id = $1 AND description = $2",
                )
                .bind(company)
                .bind(description)
                .execute(&mut *tx)
                .await
                .map_err(port_err)?;
            }
        }

        if let Some(update) = &plan.disposal_update {
            let updated = sqlx::query(
                r#"
                UPDATE fiscal_periods
                SET current_disposal_date = $1, previous_disposal_date = $2
                WHERE company_id = $3 AND fiscal_year = $4
                "#,
            )
            .bind(update.current_disposal_date)
            .bind(update.previous_disposal_date)
            .bind(company)
            .bind(update.fiscal_year.value())
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
            if updated.rows_affected() == 0 {
                return Err(PortError::not_found("FiscalPeriod", update.fiscal_year));
            }
        }

        let mut numbers = Vec::with_capacity(plan.vouchers.len());
        for voucher in &plan.vouchers {
            let lines: Vec<GeneralLine> = voucher
                .lines
                .iter()
                .enumerate()
                .map(|(index, line)| GeneralLine {
                    line_no: index as u32 + 1,
                    account_id: line.account_id,
                    partner_id: None,
                    side: line.side,
                    amount: line.amount,
                    description: line.description.clone(),
                    classification_code: None,
                })
                .collect();
            let created = insert_general_in_tx(
                &mut tx,
                plan.company_id,
                voucher.date,
                None,
                &voucher.description,
                lines,
            )
            .await?;
            numbers.push(created.number);
        }

        tx.commit().await.map_err(port_err)?;
        Ok(numbers)
    }
}
