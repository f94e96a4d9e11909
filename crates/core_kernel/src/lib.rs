//! Core Kernel - Foundational types and utilities for the bookkeeping system
//!
//! This crate provides the fundamental building blocks used across all domain
//! modules:
//! - Money types with precise decimal arithmetic and the ledger balance tolerance
//! - Fiscal calendar types (date windows, period boundary derivation)
//! - Common identifiers and value objects
//! - Port error types shared by storage adapters

pub mod error;
pub mod fiscal;
pub mod identifiers;
pub mod money;
pub mod ports;

pub use error::CoreError;
pub use fiscal::{DateRange, FiscalError, FiscalYear, next_period_bounds};
pub use identifiers::{AccountId, CompanyId, LineId, PartnerId, PeriodId, VoucherId};
pub use money::{BALANCE_TOLERANCE, DebitCredit, Money, MoneyError};
pub use ports::{DomainPort, PortError};
