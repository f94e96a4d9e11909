//! Journal storage on PostgreSQL
//!
//! Voucher numbering takes a per-(company, date) advisory lock inside the
//! inserting transaction, then derives `max(existing) + 1` across both
//! voucher families; the `(company_id, voucher_no)` unique constraint backs
//! the derivation. The unified posting view is one UNION ALL over both
//! families, with inactive trade vouchers filtered at the source.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{AccountId, CompanyId, Money, PartnerId, PortError, VoucherId};
use domain_journal::validation::balance_totals;
use domain_journal::{
    GeneralLine, GeneralVoucher, JournalStore, NewGeneralVoucher, NewTradeVoucher, Posting,
    PostingQuery, TradeLine, TradeVoucher, VoucherKind, VoucherNumber, SETTLEMENT_MARKER,
};

use crate::error::port_err;
use crate::repositories::{
    corrupt, side_from_str, side_to_str, trade_kind_from_str, trade_kind_to_str,
    voucher_number_from_str,
};
use crate::store::PgStore;

/// Serializes voucher-number derivation for one company and posting date
pub(crate) async fn lock_voucher_date(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    date: NaiveDate,
) -> Result<(), PortError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("voucher_no:{company_id}:{date}"))
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    Ok(())
}

/// Next sequence for a posting date, across both voucher families
pub(crate) async fn next_voucher_number(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    date: NaiveDate,
) -> Result<VoucherNumber, PortError> {
    let max_seq: i32 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(seq), 0)
        FROM (
            SELECT CAST(SPLIT_PART(voucher_no, '-', 2) AS INTEGER) AS seq
            FROM general_vouchers
            WHERE company_id = $1 AND voucher_date = $2
            UNION ALL
            SELECT CAST(SPLIT_PART(voucher_no, '-', 2) AS INTEGER)
            FROM trade_vouchers
            WHERE company_id = $1 AND voucher_date = $2
        ) numbers
        "#,
    )
    .bind(company_id)
    .bind(date)
    .fetch_one(&mut **tx)
    .await
    .map_err(port_err)?;

    let max_existing = u32::try_from(max_seq)
        .map_err(|_| corrupt(format!("negative voucher sequence {max_seq}")))?;
    Ok(VoucherNumber::after(
        date,
        (max_existing > 0).then_some(max_existing),
    ))
}

/// Inserts a general voucher header and lines inside an open transaction.
/// Shared with the settlement apply path, which numbers its vouchers after
/// its cleanup delete.
pub(crate) async fn insert_general_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    company_id: CompanyId,
    date: NaiveDate,
    number: Option<VoucherNumber>,
    description: &str,
    lines: Vec<GeneralLine>,
) -> Result<GeneralVoucher, PortError> {
    let company = Uuid::from(company_id);
    lock_voucher_date(tx, company, date).await?;
    let number = match number {
        Some(number) => number,
        None => next_voucher_number(tx, company, date).await?,
    };

    let (total_debit, total_credit) = balance_totals(lines.iter().map(|l| (l.side, l.amount)));
    let voucher_id = VoucherId::new();

    sqlx::query(
        r#"
        INSERT INTO general_vouchers (
            voucher_id, company_id, voucher_date, voucher_no,
            description, total_debit, total_credit
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::from(voucher_id))
    .bind(company)
    .bind(date)
    .bind(number.to_string())
    .bind(description)
    .bind(total_debit.amount())
    .bind(total_credit.amount())
    .execute(&mut **tx)
    .await
    .map_err(port_err)?;

    for line in &lines {
        sqlx::query(
            r#"
            INSERT INTO general_voucher_lines (
                line_id, voucher_id, line_no, account_id, partner_id,
                side, amount, description, classification_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(voucher_id))
        .bind(line.line_no as i32)
        .bind(Uuid::from(line.account_id))
        .bind(line.partner_id.map(Uuid::from))
        .bind(side_to_str(line.side))
        .bind(line.amount.amount())
        .bind(line.description.as_deref())
        .bind(line.classification_code.as_deref())
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    }

    Ok(GeneralVoucher {
        id: voucher_id,
        company_id,
        date,
        number,
        description: description.to_string(),
        total_debit,
        total_credit,
        lines,
    })
}

#[derive(Debug, FromRow)]
struct GeneralHeaderRow {
    voucher_id: Uuid,
    company_id: Uuid,
    voucher_date: NaiveDate,
    voucher_no: String,
    description: String,
    total_debit: Decimal,
    total_credit: Decimal,
}

#[derive(Debug, FromRow)]
struct GeneralLineRow {
    line_no: i32,
    account_id: Uuid,
    partner_id: Option<Uuid>,
    side: String,
    amount: Decimal,
    description: Option<String>,
    classification_code: Option<String>,
}

impl GeneralLineRow {
    fn into_domain(self) -> Result<GeneralLine, PortError> {
        Ok(GeneralLine {
            line_no: self.line_no as u32,
            account_id: AccountId::from(self.account_id),
            partner_id: self.partner_id.map(PartnerId::from),
            side: side_from_str(&self.side)?,
            amount: Money::new(self.amount),
            description: self.description,
            classification_code: self.classification_code,
        })
    }
}

#[derive(Debug, FromRow)]
struct TradeHeaderRow {
    voucher_id: Uuid,
    company_id: Uuid,
    voucher_date: NaiveDate,
    voucher_no: String,
    kind: String,
    partner_id: Uuid,
    description: String,
    supply_value: Decimal,
    vat_amount: Decimal,
    total_amount: Decimal,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct TradeLineRow {
    line_no: i32,
    account_id: Uuid,
    side: String,
    amount: Decimal,
    description: Option<String>,
    classification_code: Option<String>,
}

impl TradeLineRow {
    fn into_domain(self) -> Result<TradeLine, PortError> {
        Ok(TradeLine {
            line_no: self.line_no as u32,
            account_id: AccountId::from(self.account_id),
            side: side_from_str(&self.side)?,
            amount: Money::new(self.amount),
            description: self.description,
            classification_code: self.classification_code,
        })
    }
}

#[derive(Debug, FromRow)]
struct PostingRow {
    kind: String,
    voucher_id: Uuid,
    company_id: Uuid,
    voucher_date: NaiveDate,
    voucher_no: String,
    line_no: i32,
    account_id: Uuid,
    partner_id: Option<Uuid>,
    side: String,
    amount: Decimal,
    description: Option<String>,
    settlement_marked: bool,
}

impl PostingRow {
    fn into_domain(self) -> Result<Posting, PortError> {
        let kind = match self.kind.as_str() {
            "general" => VoucherKind::General,
            "trade" => VoucherKind::Trade,
            other => return Err(corrupt(format!("unknown voucher family '{other}'"))),
        };
        Ok(Posting {
            kind,
            voucher_id: VoucherId::from(self.voucher_id),
            company_id: CompanyId::from(self.company_id),
            date: self.voucher_date,
            number: voucher_number_from_str(&self.voucher_no)?,
            line_no: self.line_no as u32,
            account_id: AccountId::from(self.account_id),
            partner_id: self.partner_id.map(PartnerId::from),
            side: side_from_str(&self.side)?,
            amount: Money::new(self.amount),
            description: self.description,
            settlement_marked: self.settlement_marked,
        })
    }
}

const POSTING_SQL: &str = r#"
SELECT 'general' AS kind, v.voucher_id, v.company_id, v.voucher_date, v.voucher_no,
       l.line_no, l.account_id, l.partner_id, l.side, l.amount, l.description,
       (v.description LIKE $6) AS settlement_marked
  FROM general_voucher_lines l
  JOIN general_vouchers v ON v.voucher_id = l.voucher_id
 WHERE v.company_id = $1
   AND ($2::uuid IS NULL OR l.account_id = $2)
   AND ($3::uuid IS NULL OR l.partner_id = $3)
   AND ($4::date IS NULL OR v.voucher_date >= $4)
   AND ($5::date IS NULL OR v.voucher_date <= $5)
   AND (NOT $7 OR v.description NOT LIKE $6)
UNION ALL
SELECT 'trade' AS kind, v.voucher_id, v.company_id, v.voucher_date, v.voucher_no,
       l.line_no, l.account_id, v.partner_id, l.side, l.amount, l.description,
       (v.description LIKE $6) AS settlement_marked
  FROM trade_voucher_lines l
  JOIN trade_vouchers v ON v.voucher_id = l.voucher_id
 WHERE v.company_id = $1
   AND v.is_active
   AND ($2::uuid IS NULL OR l.account_id = $2)
   AND ($3::uuid IS NULL OR v.partner_id = $3)
   AND ($4::date IS NULL OR v.voucher_date >= $4)
   AND ($5::date IS NULL OR v.voucher_date <= $5)
   AND (NOT $7 OR v.description NOT LIKE $6)
"#;

#[async_trait]
impl JournalStore for PgStore {
    async fn insert_general(
        &self,
        voucher: NewGeneralVoucher,
    ) -> Result<GeneralVoucher, PortError> {
        let mut tx = self.pool().begin().await.map_err(port_err)?;
        let created = insert_general_in_tx(
            &mut tx,
            voucher.company_id,
            voucher.date,
            voucher.number,
            &voucher.description,
            voucher.lines,
        )
        .await?;
        tx.commit().await.map_err(port_err)?;
        Ok(created)
    }

    async fn insert_trade(&self, voucher: NewTradeVoucher) -> Result<TradeVoucher, PortError> {
        let mut tx = self.pool().begin().await.map_err(port_err)?;
        let company = Uuid::from(voucher.company_id);
        lock_voucher_date(&mut tx, company, voucher.date).await?;
        let number = match voucher.number {
            Some(number) => number,
            None => next_voucher_number(&mut tx, company, voucher.date).await?,
        };

        let total_amount: Money = voucher.lines.iter().map(|l| l.amount).sum();
        let voucher_id = VoucherId::new();

        sqlx::query(
            r#"
            INSERT INTO trade_vouchers (
                voucher_id, company_id, voucher_date, voucher_no, kind, partner_id,
                description, supply_value, vat_amount, total_amount, is_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            "#,
        )
        .bind(Uuid::from(voucher_id))
        .bind(company)
        .bind(voucher.date)
        .bind(number.to_string())
        .bind(trade_kind_to_str(voucher.kind))
        .bind(Uuid::from(voucher.partner_id))
        .bind(&voucher.description)
        .bind(voucher.supply_value.amount())
        .bind(voucher.vat_amount.amount())
        .bind(total_amount.amount())
        .execute(&mut *tx)
        .await
        .map_err(port_err)?;

        insert_trade_lines(&mut tx, voucher_id, &voucher.lines).await?;
        tx.commit().await.map_err(port_err)?;

        Ok(TradeVoucher {
            id: voucher_id,
            company_id: voucher.company_id,
            date: voucher.date,
            number,
            kind: voucher.kind,
            partner_id: voucher.partner_id,
            description: voucher.description,
            supply_value: voucher.supply_value,
            vat_amount: voucher.vat_amount,
            total_amount,
            is_active: true,
            lines: voucher.lines,
        })
    }

    async fn general_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<GeneralVoucher>, PortError> {
        let header: Option<GeneralHeaderRow> = sqlx::query_as(
            r#"
            SELECT voucher_id, company_id, voucher_date, voucher_no,
                   description, total_debit, total_credit
            FROM general_vouchers
            WHERE company_id = $1 AND voucher_id = $2
            "#,
        )
        .bind(Uuid::from(company_id))
        .bind(Uuid::from(id))
        .fetch_optional(self.pool())
        .await
        .map_err(port_err)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines: Vec<GeneralLineRow> = sqlx::query_as(
            r#"
            SELECT line_no, account_id, partner_id, side, amount,
                   description, classification_code
            FROM general_voucher_lines
            WHERE voucher_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(header.voucher_id)
        .fetch_all(self.pool())
        .await
        .map_err(port_err)?;

        Ok(Some(GeneralVoucher {
            id: VoucherId::from(header.voucher_id),
            company_id: CompanyId::from(header.company_id),
            date: header.voucher_date,
            number: voucher_number_from_str(&header.voucher_no)?,
            description: header.description,
            total_debit: Money::new(header.total_debit),
            total_credit: Money::new(header.total_credit),
            lines: lines
                .into_iter()
                .map(GeneralLineRow::into_domain)
                .collect::<Result<_, _>>()?,
        }))
    }

    async fn trade_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<TradeVoucher>, PortError> {
        let header: Option<TradeHeaderRow> = sqlx::query_as(
            r#"
            SELECT voucher_id, company_id, voucher_date, voucher_no, kind, partner_id,
                   description, supply_value, vat_amount, total_amount, is_active
            FROM trade_vouchers
            WHERE company_id = $1 AND voucher_id = $2
            "#,
        )
        .bind(Uuid::from(company_id))
        .bind(Uuid::from(id))
        .fetch_optional(self.pool())
        .await
        .map_err(port_err)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines: Vec<TradeLineRow> = sqlx::query_as(
            r#"
            SELECT line_no, account_id, side, amount, description, classification_code
            FROM trade_voucher_lines
            WHERE voucher_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(header.voucher_id)
        .fetch_all(self.pool())
        .await
        .map_err(port_err)?;

        Ok(Some(TradeVoucher {
            id: VoucherId::from(header.voucher_id),
            company_id: CompanyId::from(header.company_id),
            date: header.voucher_date,
            number: voucher_number_from_str(&header.voucher_no)?,
            kind: trade_kind_from_str(&header.kind)?,
            partner_id: PartnerId::from(header.partner_id),
            description: header.description,
            supply_value: Money::new(header.supply_value),
            vat_amount: Money::new(header.vat_amount),
            total_amount: Money::new(header.total_amount),
            is_active: header.is_active,
            lines: lines
                .into_iter()
                .map(TradeLineRow::into_domain)
                .collect::<Result<_, _>>()?,
        }))
    }

    async fn update_general(&self, voucher: &GeneralVoucher) -> Result<(), PortError> {
        let mut tx = self.pool().begin().await.map_err(port_err)?;

        let updated = sqlx::query(
            r#"
            UPDATE general_vouchers
            SET description = $1, total_debit = $2, total_credit = $3
            WHERE company_id = $4 AND voucher_id = $5
            "#,
        )
        .bind(&voucher.description)
        .bind(voucher.total_debit.amount())
        .bind(voucher.total_credit.amount())
        .bind(Uuid::from(voucher.company_id))
        .bind(Uuid::from(voucher.id))
        .execute(&mut *tx)
        .await
        .map_err(port_err)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::not_found("GeneralVoucher", voucher.id));
        }

        sqlx::query("DELETE FROM general_voucher_lines WHERE voucher_id = $1")
            .bind(Uuid::from(voucher.id))
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;

        for line in &voucher.lines {
            sqlx::query(
                r#"
                INSERT INTO general_voucher_lines (
                    line_id, voucher_id, line_no, account_id, partner_id,
                    side, amount, description, classification_code
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(Uuid::from(voucher.id))
            .bind(line.line_no as i32)
            .bind(Uuid::from(line.account_id))
            .bind(line.partner_id.map(Uuid::from))
            .bind(side_to_str(line.side))
            .bind(line.amount.amount())
            .bind(line.description.as_deref())
            .bind(line.classification_code.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
        }

        tx.commit().await.map_err(port_err)?;
        Ok(())
    }

    async fn update_trade(&self, voucher: &TradeVoucher) -> Result<(), PortError> {
        let mut tx = self.pool().begin().await.map_err(port_err)?;

        let updated = sqlx::query(
            r#"
            UPDATE trade_vouchers
            SET description = $1, supply_value = $2, vat_amount = $3, total_amount = $4
            WHERE company_id = $5 AND voucher_id = $6
            "#,
        )
        .bind(&voucher.description)
        .bind(voucher.supply_value.amount())
        .bind(voucher.vat_amount.amount())
        .bind(voucher.total_amount.amount())
        .bind(Uuid::from(voucher.company_id))
        .bind(Uuid::from(voucher.id))
        .execute(&mut *tx)
        .await
        .map_err(port_err)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::not_found("TradeVoucher", voucher.id));
        }

        sqlx::query("DELETE FROM trade_voucher_lines WHERE voucher_id = $1")
            .bind(Uuid::from(voucher.id))
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
        insert_trade_lines(&mut tx, voucher.id, &voucher.lines).await?;

        tx.commit().await.map_err(port_err)?;
        Ok(())
    }

    async fn delete_general(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<(), PortError> {
        let deleted =
            sqlx::query("DELETE FROM general_vouchers WHERE company_id = $1 AND voucher_id = $2")
                .bind(Uuid::from(company_id))
                .bind(Uuid::from(id))
                .execute(self.pool())
                .await
                .map_err(port_err)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::not_found("GeneralVoucher", id));
        }
        Ok(())
    }

    async fn delete_trade(&self, company_id: CompanyId, id: VoucherId) -> Result<(), PortError> {
        let deleted =
            sqlx::query("DELETE FROM trade_vouchers WHERE company_id = $1 AND voucher_id = $2")
                .bind(Uuid::from(company_id))
                .bind(Uuid::from(id))
                .execute(self.pool())
                .await
                .map_err(port_err)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::not_found("TradeVoucher", id));
        }
        Ok(())
    }

    async fn set_trade_active(
        &self,
        company_id: CompanyId,
        id: VoucherId,
        active: bool,
    ) -> Result<(), PortError> {
        let updated = sqlx::query(
            "UPDATE trade_vouchers SET is_active = $1 WHERE company_id = $2 AND voucher_id = $3",
        )
        .bind(active)
        .bind(Uuid::from(company_id))
        .bind(Uuid::from(id))
        .execute(self.pool())
        .await
        .map_err(port_err)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::not_found("TradeVoucher", id));
        }
        Ok(())
    }

    async fn postings(
        &self,
        company_id: CompanyId,
        query: PostingQuery,
    ) -> Result<Vec<Posting>, PortError> {
        let (start, end) = match query.range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };

        let rows: Vec<PostingRow> = sqlx::query_as(POSTING_SQL)
            .bind(Uuid::from(company_id))
            .bind(query.account_id.map(Uuid::from))
            .bind(query.partner_id.map(Uuid::from))
            .bind(start)
            .bind(end)
            .bind(format!("{SETTLEMENT_MARKER}%"))
            .bind(query.exclude_settlement_marked)
            .fetch_all(self.pool())
            .await
            .map_err(port_err)?;

        rows.into_iter().map(PostingRow::into_domain).collect()
    }
}

async fn insert_trade_lines(
    tx: &mut Transaction<'_, Postgres>,
    voucher_id: VoucherId,
    lines: &[TradeLine],
) -> Result<(), PortError> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO trade_voucher_lines (
                line_id, voucher_id, line_no, account_id,
                side, amount, description, classification_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(voucher_id))
        .bind(line.line_no as i32)
        .bind(Uuid::from(line.account_id))
        .bind(side_to_str(line.side))
        .bind(line.amount.amount())
        .bind(line.description.as_deref())
        .bind(line.classification_code.as_deref())
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    }
    Ok(())
}
