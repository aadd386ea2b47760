//! Database Test Utilities
//!
//! Provides helpers for database testing including testcontainer management
//! and seeding for integration tests. Tests using them need Docker.

use core_kernel::{Money, ProductId};
use infra_db::{run_migrations, DatabaseConfig, LockStrategy, PgUnitOfWorkFactory};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

/// Default PostgreSQL tag for testing
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "pos_test";

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container with the schema migrated
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or migrations fail
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432.tcp()).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Builds a unit-of-work factory on this database
    ///
    /// The lock strategy is negotiated unless one is given.
    pub async fn factory(
        &self,
        lock_timeout: Duration,
        lock: Option<LockStrategy>,
    ) -> Result<PgUnitOfWorkFactory, Box<dyn std::error::Error + Send + Sync>> {
        let mut config = DatabaseConfig::new(self.config.connection_url()).lock_timeout(lock_timeout);
        config.lock_strategy = lock;
        Ok(PgUnitOfWorkFactory::connect(self.pool.clone(), &config).await?)
    }

    /// Inserts a product with nothing on hand and returns its id
    pub async fn insert_product(
        &self,
        name: &str,
        unit_cost: Money,
    ) -> Result<ProductId, Box<dyn std::error::Error + Send + Sync>> {
        let id: i64 = sqlx::query_scalar("INSERT INTO products (name, unit_cost) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(unit_cost.amount())
            .fetch_one(&self.pool)
            .await?;
        Ok(ProductId::new(id))
    }

}

/// Creates an isolated test database for a single test
///
/// Use this when tests need to modify data and isolation is required
pub async fn create_isolated_test_database() -> Result<TestDatabase, Box<dyn std::error::Error + Send + Sync>> {
    TestDatabase::new().await
}
