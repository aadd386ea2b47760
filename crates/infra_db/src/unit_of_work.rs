//! PostgreSQL units of work
//!
//! A [`PgUnitOfWork`] wraps one open SQLx transaction and implements both
//! domain stores on it, so the lot changes and the journal entry of one
//! business event commit together. Dropping the unit without calling
//! `commit` rolls the transaction back.
//!
//! Every transaction starts with `SET LOCAL lock_timeout`, so a contended
//! row lock fails with `55P03` after the configured bound instead of waiting
//! forever. That failure reaches the domain as [`PortError::Timeout`].

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError, TransactionScope, UnitOfWorkFactory};

use crate::error::DatabaseError;
use crate::locking::LockStrategy;
use crate::pool::{DatabaseConfig, DatabasePool};

/// Opens [`PgUnitOfWork`]s against a pool
///
/// The lock strategy is settled when the factory is built and shared by
/// every unit it opens.
#[derive(Debug, Clone)]
pub struct PgUnitOfWorkFactory {
    pool: DatabasePool,
    lock: LockStrategy,
    lock_timeout: Duration,
}

impl PgUnitOfWorkFactory {
    /// Creates a factory with an explicit strategy
    pub fn new(pool: DatabasePool, lock: LockStrategy, lock_timeout: Duration) -> Self {
        Self {
            pool,
            lock,
            lock_timeout,
        }
    }

    /// Creates a factory, negotiating the lock strategy unless configured
    pub async fn connect(pool: DatabasePool, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let lock = LockStrategy::resolve(&pool, config.lock_strategy).await?;
        Ok(Self::new(pool, lock, config.lock_timeout))
    }

    pub fn lock_strategy(&self) -> LockStrategy {
        self.lock
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Begins a transaction with the bounded lock wait applied
    #[instrument(skip(self), fields(lock = %self.lock))]
    pub async fn begin_work(&self) -> Result<PgUnitOfWork, PortError> {
        let lock_wait_ms = u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX);
        let fail = |err: sqlx::Error| DatabaseError::from(err).into_port_error("begin unit of work", lock_wait_ms);

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{lock_wait_ms}ms"))
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        debug!(lock_wait_ms, "Unit of work started");
        Ok(PgUnitOfWork {
            tx,
            lock: self.lock,
            lock_wait_ms,
        })
    }
}

impl DomainPort for PgUnitOfWorkFactory {}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, PortError> {
        self.begin_work().await
    }
}

/// One open database transaction
///
/// Implements [`domain_inventory::InventoryStore`] and
/// [`domain_ledger::JournalStore`]; see `crate::repositories`.
#[derive(Debug)]
pub struct PgUnitOfWork {
    pub(crate) tx: Transaction<'static, Postgres>,
    pub(crate) lock: LockStrategy,
    pub(crate) lock_wait_ms: u64,
}

impl PgUnitOfWork {
    /// Maps a failed statement to the domain error for `operation`
    pub(crate) fn fail(&self, operation: &'static str) -> impl FnOnce(sqlx::Error) -> PortError {
        let lock_wait_ms = self.lock_wait_ms;
        move |err| DatabaseError::from(err).into_port_error(operation, lock_wait_ms)
    }

    /// Maps a row that cannot be decoded into the domain
    pub(crate) fn corrupt(&self, operation: &'static str) -> impl FnOnce(DatabaseError) -> PortError {
        let lock_wait_ms = self.lock_wait_ms;
        move |err| err.into_port_error(operation, lock_wait_ms)
    }

    /// Rolls back explicitly instead of on drop
    pub async fn rollback(self) -> Result<(), PortError> {
        let fail = self.fail("rollback unit of work");
        self.tx.rollback().await.map_err(fail)
    }
}

#[async_trait]
impl TransactionScope for PgUnitOfWork {
    async fn commit(self) -> Result<(), PortError> {
        let fail = self.fail("commit unit of work");
        self.tx.commit().await.map_err(fail)?;
        debug!("Unit of work committed");
        Ok(())
    }
}
