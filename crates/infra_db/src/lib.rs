//! Infrastructure database layer
//!
//! PostgreSQL adapter for the bookkeeping core, built on SQLx. [`PgStore`]
//! implements every domain port; each mutating port method runs as a single
//! SQL transaction, and closings of the same fiscal period serialize on
//! advisory locks so two callers can never interleave a delete-and-reinsert.
//!
//! Queries use the SQLx runtime API (no compile-time database), and the
//! schema ships as embedded migrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, PgStore};
//!
//! let store = PgStore::connect(DatabaseConfig::from_env()?).await?;
//! store.migrate().await?;
//! ```

pub mod error;
pub mod pool;
pub mod repositories;
pub mod store;

pub use error::DatabaseError;
pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use store::PgStore;
