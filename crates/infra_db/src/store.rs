//! The PostgreSQL store
//!
//! One adapter struct implements every domain port. Port method bodies live
//! in the `repositories` modules, grouped the way the domains group them.

use sqlx::PgPool;
use tracing::info;

use core_kernel::DomainPort;

use crate::error::DatabaseError;
use crate::pool::{create_pool, DatabaseConfig};

/// PostgreSQL adapter for the chart, journal, and closing ports
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool from configuration
    pub async fn connect(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        Ok(Self::new(create_pool(config).await?))
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        info!("database migrations applied");
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgStore {}
