//! Journal application services
//!
//! The operations behind the transaction endpoints: create/replace vouchers,
//! single-line mutations, deletions. Every operation re-validates the full
//! line set it would leave behind and hands the store one atomic unit to
//! apply. The company id arrives from the (external) authentication layer.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use core_kernel::{CompanyId, Money, VoucherId};

use crate::error::JournalError;
use crate::numbering::VoucherNumber;
use crate::ports::{ChartStore, JournalStore, NewGeneralVoucher, NewTradeVoucher};
use crate::validation::{
    balance_totals, ensure_amount, ensure_balanced, ensure_non_empty, ensure_postable_account,
    ensure_postable_partner,
};
use crate::voucher::{GeneralLine, GeneralVoucher, Side, TradeKind, TradeLine, TradeVoucher};

/// One requested voucher line, addressed by reference codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub account_code: String,
    pub partner_code: Option<String>,
    pub side: Side,
    pub amount: Decimal,
    pub description: Option<String>,
    pub classification_code: Option<String>,
}

/// A requested general voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherInput {
    pub date: NaiveDate,
    /// Explicit number; omitted numbers are derived per `(company, date)`
    pub number: Option<VoucherNumber>,
    pub description: String,
    pub lines: Vec<LineInput>,
}

/// A requested trade voucher line (the partner lives on the header)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLineInput {
    pub account_code: String,
    pub side: Side,
    pub amount: Decimal,
    pub description: Option<String>,
    pub classification_code: Option<String>,
}

/// A requested trade voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeVoucherInput {
    pub date: NaiveDate,
    pub number: Option<VoucherNumber>,
    pub kind: TradeKind,
    pub partner_code: String,
    pub description: String,
    pub supply_value: Decimal,
    pub vat_amount: Decimal,
    pub lines: Vec<TradeLineInput>,
}

/// Identifies a created voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherReceipt {
    pub voucher_id: VoucherId,
    pub number: VoucherNumber,
}

/// Outcome of a line deletion
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineDeletion {
    /// True when the deleted line was the last one and the parent voucher
    /// was removed with it
    pub voucher_deleted: bool,
}

/// Service exposing the journal mutation operations
pub struct JournalService<S> {
    store: Arc<S>,
}

impl<S> JournalService<S>
where
    S: JournalStore + ChartStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a general voucher from a validated, balanced line set
    pub async fn create_general(
        &self,
        company_id: CompanyId,
        input: VoucherInput,
    ) -> Result<VoucherReceipt, JournalError> {
        let lines = self.resolve_general_lines(company_id, &input.lines).await?;
        validate_line_set(lines.iter().map(|l| (l.side, l.amount)), lines.len())?;

        let created = self
            .store
            .insert_general(NewGeneralVoucher {
                company_id,
                date: input.date,
                number: input.number,
                description: input.description,
                lines,
            })
            .await?;

        info!(company = %company_id, number = %created.number, "general voucher created");
        Ok(VoucherReceipt {
            voucher_id: created.id,
            number: created.number,
        })
    }

    /// Replaces a voucher's description and full line set wholesale.
    /// Date and number are immutable once assigned.
    pub async fn update_general(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
        description: String,
        lines: Vec<LineInput>,
    ) -> Result<(), JournalError> {
        let mut voucher = self.fetch_general(company_id, voucher_id).await?;
        let lines = self.resolve_general_lines(company_id, &lines).await?;
        validate_line_set(lines.iter().map(|l| (l.side, l.amount)), lines.len())?;

        voucher.description = description;
        voucher.lines = lines;
        voucher.recompute_totals();
        self.store.update_general(&voucher).await?;
        Ok(())
    }

    /// Appends one line; the resulting full set must still balance
    pub async fn add_line(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
        line: LineInput,
    ) -> Result<u32, JournalError> {
        let mut voucher = self.fetch_general(company_id, voucher_id).await?;
        self.revalidate_stored_lines(company_id, &voucher).await?;

        let line_no = voucher.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
        let resolved = self.resolve_line(company_id, line_no, &line).await?;
        voucher.lines.push(resolved);

        self.commit_general_lines(&mut voucher).await?;
        Ok(line_no)
    }

    /// Rewrites one line in place; the resulting full set must still balance
    pub async fn update_line(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
        line_no: u32,
        line: LineInput,
    ) -> Result<(), JournalError> {
        let mut voucher = self.fetch_general(company_id, voucher_id).await?;
        self.revalidate_stored_lines(company_id, &voucher).await?;

        let resolved = self.resolve_line(company_id, line_no, &line).await?;
        let slot = voucher
            .lines
            .iter_mut()
            .find(|l| l.line_no == line_no)
            .ok_or(JournalError::LineNotFound {
                voucher_id,
                line_no,
            })?;
        *slot = resolved;

        self.commit_general_lines(&mut voucher).await
    }

    /// Deletes one line. Removing the final line deletes the parent voucher;
    /// otherwise the remaining set must still balance.
    pub async fn delete_line(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
        line_no: u32,
    ) -> Result<LineDeletion, JournalError> {
        let mut voucher = self.fetch_general(company_id, voucher_id).await?;

        let before = voucher.lines.len();
        voucher.lines.retain(|l| l.line_no != line_no);
        if voucher.lines.len() == before {
            return Err(JournalError::LineNotFound {
                voucher_id,
                line_no,
            });
        }

        if voucher.lines.is_empty() {
            self.store.delete_general(company_id, voucher_id).await?;
            debug!(company = %company_id, voucher = %voucher_id, "last line removed, voucher deleted");
            return Ok(LineDeletion {
                voucher_deleted: true,
            });
        }

        self.commit_general_lines(&mut voucher).await?;
        Ok(LineDeletion {
            voucher_deleted: false,
        })
    }

    /// Deletes a voucher with all its lines
    pub async fn delete_general(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
    ) -> Result<(), JournalError> {
        // Existence check keeps deletion idempotent failures explicit
        self.fetch_general(company_id, voucher_id).await?;
        self.store.delete_general(company_id, voucher_id).await?;
        Ok(())
    }

    /// Creates a trade voucher bound to one business partner
    pub async fn create_trade(
        &self,
        company_id: CompanyId,
        input: TradeVoucherInput,
    ) -> Result<VoucherReceipt, JournalError> {
        let partner = self
            .store
            .partner_by_code(company_id, &input.partner_code)
            .await?
            .ok_or_else(|| JournalError::PartnerNotFound {
                code: input.partner_code.clone(),
            })?;
        ensure_postable_partner(&partner, company_id)?;

        let lines = self.resolve_trade_lines(company_id, &input.lines).await?;
        validate_line_set(lines.iter().map(|l| (l.side, l.amount)), lines.len())?;

        let created = self
            .store
            .insert_trade(NewTradeVoucher {
                company_id,
                date: input.date,
                number: input.number,
                kind: input.kind,
                partner_id: partner.id,
                description: input.description,
                supply_value: Money::new(input.supply_value),
                vat_amount: Money::new(input.vat_amount),
                lines,
            })
            .await?;

        info!(company = %company_id, number = %created.number, "trade voucher created");
        Ok(VoucherReceipt {
            voucher_id: created.id,
            number: created.number,
        })
    }

    /// Replaces a trade voucher's description and full line set wholesale
    pub async fn update_trade(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
        description: String,
        lines: Vec<TradeLineInput>,
    ) -> Result<(), JournalError> {
        let mut voucher = self.fetch_trade(company_id, voucher_id).await?;
        let lines = self.resolve_trade_lines(company_id, &lines).await?;
        validate_line_set(lines.iter().map(|l| (l.side, l.amount)), lines.len())?;

        voucher.description = description;
        voucher.lines = lines;
        voucher.recompute_totals();
        self.store.update_trade(&voucher).await?;
        Ok(())
    }

    /// Soft-deactivates a trade voucher, removing it from every ledger,
    /// report, and closing computation
    pub async fn deactivate_trade(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
    ) -> Result<(), JournalError> {
        self.fetch_trade(company_id, voucher_id).await?;
        self.store
            .set_trade_active(company_id, voucher_id, false)
            .await?;
        Ok(())
    }

    async fn fetch_general(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
    ) -> Result<GeneralVoucher, JournalError> {
        self.store
            .general_by_id(company_id, voucher_id)
            .await?
            .ok_or(JournalError::VoucherNotFound(voucher_id))
    }

    async fn fetch_trade(
        &self,
        company_id: CompanyId,
        voucher_id: VoucherId,
    ) -> Result<TradeVoucher, JournalError> {
        self.store
            .trade_by_id(company_id, voucher_id)
            .await?
            .ok_or(JournalError::VoucherNotFound(voucher_id))
    }

    async fn resolve_line(
        &self,
        company_id: CompanyId,
        line_no: u32,
        input: &LineInput,
    ) -> Result<GeneralLine, JournalError> {
        let amount = ensure_amount(line_no, input.amount)?;

        let account = self
            .store
            .account_by_code(company_id, &input.account_code)
            .await?
            .ok_or_else(|| JournalError::AccountNotFound {
                code: input.account_code.clone(),
            })?;
        ensure_postable_account(&account, company_id)?;

        let partner_id = match &input.partner_code {
            Some(code) => {
                let partner = self
                    .store
                    .partner_by_code(company_id, code)
                    .await?
                    .ok_or_else(|| JournalError::PartnerNotFound { code: code.clone() })?;
                ensure_postable_partner(&partner, company_id)?;
                Some(partner.id)
            }
            None => None,
        };

        Ok(GeneralLine {
            line_no,
            account_id: account.id,
            partner_id,
            side: input.side,
            amount,
            description: input.description.clone(),
            classification_code: input.classification_code.clone(),
        })
    }

    async fn resolve_general_lines(
        &self,
        company_id: CompanyId,
        inputs: &[LineInput],
    ) -> Result<Vec<GeneralLine>, JournalError> {
        let mut lines = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            lines.push(self.resolve_line(company_id, index as u32 + 1, input).await?);
        }
        Ok(lines)
    }

    async fn resolve_trade_lines(
        &self,
        company_id: CompanyId,
        inputs: &[TradeLineInput],
    ) -> Result<Vec<TradeLine>, JournalError> {
        let mut lines = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let line_no = index as u32 + 1;
            let amount = ensure_amount(line_no, input.amount)?;
            let account = self
                .store
                .account_by_code(company_id, &input.account_code)
                .await?
                .ok_or_else(|| JournalError::AccountNotFound {
                    code: input.account_code.clone(),
                })?;
            ensure_postable_account(&account, company_id)?;
            lines.push(TradeLine {
                line_no,
                account_id: account.id,
                side: input.side,
                amount,
                description: input.description.clone(),
                classification_code: input.classification_code.clone(),
            });
        }
        Ok(lines)
    }

    /// Re-resolves every stored line's references; accounts or partners
    /// deactivated since the voucher was written fail the mutation
    async fn revalidate_stored_lines(
        &self,
        company_id: CompanyId,
        voucher: &GeneralVoucher,
    ) -> Result<(), JournalError> {
        for line in &voucher.lines {
            let account = self
                .store
                .account_by_id(company_id, line.account_id)
                .await?
                .ok_or_else(|| JournalError::AccountNotFound {
                    code: line.account_id.to_string(),
                })?;
            ensure_postable_account(&account, company_id)?;

            if let Some(partner_id) = line.partner_id {
                let partner = self
                    .store
                    .partner_by_id(company_id, partner_id)
                    .await?
                    .ok_or_else(|| JournalError::PartnerNotFound {
                        code: partner_id.to_string(),
                    })?;
                ensure_postable_partner(&partner, company_id)?;
            }
        }
        Ok(())
    }

    /// Recomputes totals, enforces the balance invariant, persists wholesale
    async fn commit_general_lines(
        &self,
        voucher: &mut GeneralVoucher,
    ) -> Result<(), JournalError> {
        voucher.recompute_totals();
        ensure_balanced(voucher.total_debit, voucher.total_credit)?;
        self.store.update_general(voucher).await?;
        Ok(())
    }
}

fn validate_line_set(
    sides: impl Iterator<Item = (Side, Money)>,
    count: usize,
) -> Result<(), JournalError> {
    ensure_non_empty(count)?;
    let (debits, credits) = balance_totals(sides);
    ensure_balanced(debits, credits)
}
