//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL adapters of the POS accounting core
//! using SQLx.
//!
//! # Architecture
//!
//! A [`PgUnitOfWorkFactory`] opens [`PgUnitOfWork`]s. Each unit is one
//! database transaction implementing both `domain_inventory::InventoryStore`
//! and `domain_ledger::JournalStore`, so a FIFO consumption and the journal
//! entry it belongs to commit together or not at all.
//!
//! # Locking
//!
//! Open lots are locked row by row with the [`LockStrategy`] negotiated once
//! against the server version. Every transaction bounds lock waits with
//! `lock_timeout`; an expired wait surfaces as `PortError::Timeout`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PgUnitOfWorkFactory};
//!
//! let config = DatabaseConfig::new("postgres://localhost/pos");
//! let pool = create_pool(&config).await?;
//! let factory = PgUnitOfWorkFactory::connect(pool, &config).await?;
//! let mut work = factory.begin().await?;
//! ```

pub mod pool;
pub mod error;
pub mod locking;
pub mod migrate;
pub mod unit_of_work;
pub mod repositories;

pub use pool::{create_pool, DatabaseConfig, DatabasePool, DEFAULT_LOCK_TIMEOUT};
pub use error::DatabaseError;
pub use locking::LockStrategy;
pub use migrate::{run_migrations, MIGRATOR};
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};
