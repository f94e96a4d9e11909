//! Journal storage ports
//!
//! The journal domain defines what it needs from storage; adapters provide
//! it (`infra_db` on PostgreSQL, `test_utils` in memory). Every mutating
//! method is one atomic unit: it commits completely or not at all.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    AccountId, CompanyId, DateRange, DomainPort, Money, PartnerId, PortError, VoucherId,
};

use crate::account::Account;
use crate::numbering::VoucherNumber;
use crate::partner::BusinessPartner;
use crate::voucher::{GeneralLine, GeneralVoucher, Posting, TradeKind, TradeLine, TradeVoucher};

/// Read access to the externally-owned chart of accounts and partner registry
#[async_trait]
pub trait ChartStore: DomainPort {
    async fn account_by_id(
        &self,
        company_id: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, PortError>;

    async fn account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<Account>, PortError>;

    async fn partner_by_id(
        &self,
        company_id: CompanyId,
        id: PartnerId,
    ) -> Result<Option<BusinessPartner>, PortError>;

    async fn partner_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Option<BusinessPartner>, PortError>;

    /// All accounts of a company, ordered by code
    async fn accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError>;
}

/// A general voucher to insert. When `number` is absent the store derives
/// `max(existing sequence for the date) + 1` inside the inserting transaction.
#[derive(Debug, Clone)]
pub struct NewGeneralVoucher {
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub number: Option<VoucherNumber>,
    pub description: String,
    pub lines: Vec<GeneralLine>,
}

/// A trade voucher to insert; numbering works as for general vouchers
#[derive(Debug, Clone)]
pub struct NewTradeVoucher {
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub number: Option<VoucherNumber>,
    pub kind: TradeKind,
    pub partner_id: PartnerId,
    pub description: String,
    pub supply_value: Money,
    pub vat_amount: Money,
    pub lines: Vec<TradeLine>,
}

/// Filter for the unified posting view over both voucher families
#[derive(Debug, Clone, Default)]
pub struct PostingQuery {
    pub account_id: Option<AccountId>,
    pub partner_id: Option<PartnerId>,
    pub range: Option<DateRange>,
    /// Drop postings of settlement-generated vouchers
    pub exclude_settlement_marked: bool,
}

impl PostingQuery {
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    pub fn with_partner(mut self, partner_id: PartnerId) -> Self {
        self.partner_id = Some(partner_id);
        self
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn excluding_settlement(mut self) -> Self {
        self.exclude_settlement_marked = true;
        self
    }
}

/// Storage for both voucher families
#[async_trait]
pub trait JournalStore: DomainPort {
    /// Inserts a general voucher with its lines and stored totals; number
    /// derivation and insert share one transaction
    async fn insert_general(&self, voucher: NewGeneralVoucher)
        -> Result<GeneralVoucher, PortError>;

    async fn insert_trade(&self, voucher: NewTradeVoucher) -> Result<TradeVoucher, PortError>;

    async fn general_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<GeneralVoucher>, PortError>;

    async fn trade_by_id(
        &self,
        company_id: CompanyId,
        id: VoucherId,
    ) -> Result<Option<TradeVoucher>, PortError>;

    /// Replaces a general voucher's description, line set, and stored totals
    /// wholesale in one transaction
    async fn update_general(&self, voucher: &GeneralVoucher) -> Result<(), PortError>;

    async fn update_trade(&self, voucher: &TradeVoucher) -> Result<(), PortError>;

    async fn delete_general(&self, company_id: CompanyId, id: VoucherId)
        -> Result<(), PortError>;

    async fn delete_trade(&self, company_id: CompanyId, id: VoucherId) -> Result<(), PortError>;

    /// Soft-deactivates a trade voucher, hiding it from ledgers and closing
    async fn set_trade_active(
        &self,
        company_id: CompanyId,
        id: VoucherId,
        active: bool,
    ) -> Result<(), PortError>;

    /// The unified posting view: both families merged, inactive trade
    /// vouchers excluded, in no particular order (callers sort by the
    /// canonical key)
    async fn postings(
        &self,
        company_id: CompanyId,
        query: PostingQuery,
    ) -> Result<Vec<Posting>, PortError>;
}
