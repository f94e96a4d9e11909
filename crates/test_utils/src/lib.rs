//! Test utilities crate
//!
//! Shared test infrastructure for the bookkeeping core test suite.
//!
//! # Modules
//!
//! - `fixtures`: pre-built companies, charts of accounts, and fiscal periods
//! - `builders`: builder patterns for voucher request construction
//! - `memory`: an in-memory adapter implementing every storage port, for
//!   service-level tests without a database
//! - `assertions`: custom assertion helpers for domain types
//! - `generators`: property-based test data generators
//! - `database`: PostgreSQL testcontainer helpers for live-store tests

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;
pub mod memory;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use memory::MemoryStore;

/// Initializes tracing output for a test binary. Safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}
