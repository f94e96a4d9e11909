//! Database error types
//!
//! Maps SQLx failures onto meaningful variants and onto the domain-facing
//! [`PortError`] so adapters surface storage problems uniformly.

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }
}

/// Classifies an SQLx error by its PostgreSQL error code
///
/// https://www.postgresql.org/docs/current/errcodes-appendix.html
pub fn classify(error: sqlx::Error) -> DatabaseError {
    match &error {
        sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
        sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "23505" => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                    "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                    "23514" => DatabaseError::ConstraintViolation(db_err.message().to_string()),
                    _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                }
            } else {
                DatabaseError::QueryFailed(db_err.message().to_string())
            }
        }
        _ => DatabaseError::SqlError(error),
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(message) => PortError::NotFound {
                entity_type: "Record".to_string(),
                id: message,
            },
            DatabaseError::DuplicateEntry(message)
            | DatabaseError::ForeignKeyViolation(message)
            | DatabaseError::ConstraintViolation(message) => PortError::Conflict { message },
            DatabaseError::ConnectionFailed(message) => PortError::Connection {
                message,
                source: None,
            },
            DatabaseError::PoolExhausted => PortError::Connection {
                message: "connection pool exhausted".to_string(),
                source: None,
            },
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Shorthand for adapter code: classify an SQLx error and lift it to the
/// port layer in one step
pub fn port_err(error: sqlx::Error) -> PortError {
    classify(error).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_classification() {
        let classified = classify(sqlx::Error::RowNotFound);
        assert!(matches!(classified, DatabaseError::NotFound(_)));
    }

    #[test]
    fn test_constraint_violations_map_to_conflict() {
        let error = DatabaseError::DuplicateEntry("voucher_no".to_string());
        assert!(error.is_constraint_violation());
        let port: PortError = error.into();
        assert!(matches!(port, PortError::Conflict { .. }));
    }

    #[test]
    fn test_pool_exhaustion_maps_to_connection() {
        let port: PortError = DatabaseError::PoolExhausted.into();
        assert!(matches!(port, PortError::Connection { .. }));
    }
}
