//! Database connection pool management
//!
//! Connection pool configuration and creation for PostgreSQL using SQLx.
//! Configuration loads from the environment (with `.env` support) in the
//! `BOOKS_`-prefixed namespace.

use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Configuration options for the database connection pool
///
/// # Example
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/books")
///     .max_connections(20)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    #[serde(default = "defaults::min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "defaults::connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

mod defaults {
    pub fn max_connections() -> u32 {
        10
    }
    pub fn min_connections() -> u32 {
        2
    }
    pub fn connect_timeout_secs() -> u64 {
        30
    }
}

impl DatabaseConfig {
    /// Creates a new database configuration with the given connection URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            database_url: url.into(),
            max_connections: defaults::max_connections(),
            min_connections: defaults::min_connections(),
            connect_timeout_secs: defaults::connect_timeout_secs(),
        }
    }

    /// Loads configuration from `BOOKS_`-prefixed environment variables,
    /// reading a `.env` file first when present
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::Environment::with_prefix("BOOKS"))
            .build()?
            .try_deserialize()
    }

    /// Sets the maximum number of connections in the pool
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections to maintain
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout duration
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/books")
    }
}

/// Creates a database connection pool with the given configuration
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` if the pool cannot be created
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        "Creating database pool with max_connections={}, min_connections={}",
        config.max_connections, config.min_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("Database pool created successfully");
    Ok(pool)
}
