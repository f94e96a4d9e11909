//! Database test utilities
//!
//! Testcontainer management for live-PostgreSQL integration tests. Tests
//! that need a real store start (or share) a disposable Postgres container
//! and run the embedded migrations against it.

use once_cell::sync::Lazy;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;

use infra_db::PgStore;

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "books_test";

/// A PostgreSQL test container with a migrated schema
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub pool: PgPool,
    pub store: PgStore,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container and applies the schema migrations
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();
        let url = format!(
            "postgres://{POSTGRES_USER}:{POSTGRES_PASSWORD}@{host}:{port}/{POSTGRES_DB}"
        );

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;

        let store = PgStore::new(pool.clone());
        store.migrate().await?;

        Ok(Self {
            _container: container,
            pool,
            store,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn store(&self) -> PgStore {
        self.store.clone()
    }
}

/// Shared test database for integration tests that can tolerate shared
/// state, avoiding a container start per test
static SHARED_TEST_DB: Lazy<OnceCell<Arc<TestDatabase>>> = Lazy::new(OnceCell::new);

/// Gets or creates the shared test database instance
///
/// # Panics
///
/// Panics if the container or migrations fail, which fails the test run
pub async fn shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("failed to start test database container"),
            )
        })
        .await
        .clone()
}
