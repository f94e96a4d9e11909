//! Chart-of-accounts and partner reads
//!
//! Reference data is owned by an external service; this adapter only reads
//! it for validation and reporting.

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::{AccountId, CompanyId, PartnerId, PortError};
use domain_journal::{Account, BusinessPartner, ChartStore};

use crate::error::port_err;
use crate::repositories::account_type_from_str;
use crate::store::PgStore;

#[derive(Debug, FromRow)]
struct AccountRow {
    account_id: Uuid,
    company_id: Uuid,
    account_code: String,
    account_name: String,
    account_type: String,
    is_active: bool,
}

impl AccountRow {
    fn into_domain(self) -> Result<Account, PortError> {
        Ok(Account {
            id: AccountId::from(self.account_id),
            company_id: CompanyId::from(self.company_id),
            code: self.account_code,
            name: self.account_name,
            account_type: account_type_from_str(&self.account_type)?,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct PartnerRow {
    partner_id: Uuid,
    company_id: Uuid,
    partner_code: String,
    partner_name: String,
    is_active: bool,
}

impl PartnerRow {
    fn into_domain(self) -> BusinessPartner {
        BusinessPartner {
            id: PartnerId::from(self.partner_id),
            company_id: CompanyId::from(self.company_id),
            code: self.partner_code,
            name: self.partner_name,
            is_active: self.is_active,
        }
    }
}

const ACCOUNT_COLUMNS: &str =
    "account_id, company_id, account_code, account_name, account_type, is_active";
const PARTNER_COLUMNS: &str = "partner_id, company_id, partner_code, partner_name, is_active";

#[async_trait]
impl ChartStore for PgStore {
    async fn account_by_id(
        &self,
        company_id: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, PortError> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE company_id = $1 AND account_id = $2");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(company_id))
            .bind(Uuid::from(id))
            .fetch_optional(self.pool())
            .await
            .map_err(port_err)?;
        row.map(AccountRow::into_domain).transpose()
    }

    async fn account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<Account>, PortError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE company_id = $1 AND account_code = $2"
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(company_id))
            .bind(code)
            .fetch_optional(self.pool())
            .await
            .map_err(port_err)?;
        row.map(AccountRow::into_domain).transpose()
    }

    async fn partner_by_id(
        &self,
        company_id: CompanyId,
        id: PartnerId,
    ) -> Result<Option<BusinessPartner>, PortError> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM business_partners WHERE company_id = $1 AND partner_id = $2"
        );
        let row: Option<PartnerRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(company_id))
            .bind(Uuid::from(id))
            .fetch_optional(self.pool())
            .await
            .map_err(port_err)?;
        Ok(row.map(PartnerRow::into_domain))
    }

    async fn partner_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<BusinessPartner>, PortError> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM business_partners WHERE company_id = $1 AND partner_code = $2"
        );
        let row: Option<PartnerRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(company_id))
            .bind(code)
            .fetch_optional(self.pool())
            .await
            .map_err(port_err)?;
        Ok(row.map(PartnerRow::into_domain))
    }

    async fn accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE company_id = $1 ORDER BY account_code"
        );
        let rows: Vec<AccountRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(company_id))
            .fetch_all(self.pool())
            .await
            .map_err(port_err)?;
        rows.into_iter().map(AccountRow::into_domain).collect()
    }
}
