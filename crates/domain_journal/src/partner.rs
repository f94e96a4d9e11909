//! Business partner reference data
//!
//! Partners (customers, suppliers) are owned by an external collaborator
//! service. Voucher lines reference them optionally for sub-ledger reporting;
//! trade vouchers are always bound to exactly one partner.

use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, PartnerId};

/// A business partner referenced by voucher lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessPartner {
    /// Unique identifier
    pub id: PartnerId,
    /// Owning company
    pub company_id: CompanyId,
    /// Partner code, unique per company (e.g. "00001")
    pub code: String,
    /// Partner name
    pub name: String,
    /// Whether the partner may appear on new vouchers
    pub is_active: bool,
}

impl BusinessPartner {
    pub fn new(
        id: PartnerId,
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            company_id,
            code: code.into(),
            name: name.into(),
            is_active: true,
        }
    }
}
