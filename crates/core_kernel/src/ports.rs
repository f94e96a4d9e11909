//! Ports and adapters infrastructure
//!
//! Each domain crate defines async port traits for the storage it needs;
//! adapters implement them (`infra_db` against PostgreSQL, `test_utils`
//! against process memory). This module holds the pieces shared by every
//! port: the unified error type and the marker trait.
//!
//! ```rust,ignore
//! // In domain_journal/src/ports.rs
//! #[async_trait]
//! pub trait JournalStore: DomainPort {
//!     async fn fetch_voucher(&self, id: VoucherId) -> Result<Voucher, PortError>;
//! }
//!
//! // In infra_db - PostgreSQL adapter
//! impl JournalStore for PgStore { ... }
//! ```

use std::fmt;
use thiserror::Error;

/// Error type for port operations
///
/// All adapters map their native failures onto this type so domain services
/// handle storage errors uniformly.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The operation conflicts with existing data
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Connection to the underlying store failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal adapter error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// Port traits extend this marker to guarantee they are thread-safe and
/// usable from async contexts.
pub trait DomainPort: Send + Sync + 'static {}
