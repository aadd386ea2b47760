//! Row lock strategy
//!
//! The FIFO engine locks the oldest open lot of a product before draining
//! it. How that lock is requested depends on what the server supports:
//!
//! | Strategy     | Clause                    | Server           |
//! |--------------|---------------------------|------------------|
//! | `SkipLocked` | `FOR UPDATE SKIP LOCKED`  | 9.5 and later    |
//! | `NoWait`     | `FOR UPDATE NOWAIT`       | 8.1 and later    |
//! | `Exclusive`  | `FOR UPDATE`              | anything         |
//! | `Unlocked`   | none                      | forced only      |
//!
//! The strategy is negotiated once when the unit-of-work factory is built.
//! Lookups that target one known row (a lot being restored, the lots of a
//! source document, a journal entry) must never skip it and always use the
//! plain `FOR UPDATE` clause.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use tracing::{info, warn};

use crate::error::DatabaseError;

/// How open lots are locked while they are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    SkipLocked,
    NoWait,
    Exclusive,
    /// No row locks at all; only ever chosen through configuration
    Unlocked,
}

impl LockStrategy {
    /// Picks the strongest strategy a server version supports
    ///
    /// `version_num` is the value of `server_version_num`, e.g. `160002`.
    pub fn for_server_version(version_num: i64) -> Self {
        if version_num >= 90_500 {
            LockStrategy::SkipLocked
        } else if version_num >= 80_100 {
            LockStrategy::NoWait
        } else {
            LockStrategy::Exclusive
        }
    }

    /// Asks the server which strategy it supports
    pub async fn negotiate(pool: &PgPool) -> Result<Self, DatabaseError> {
        let version: String = sqlx::query_scalar("SELECT current_setting('server_version_num')")
            .fetch_one(pool)
            .await?;
        let version_num = version.trim().parse::<i64>().map_err(|_| {
            DatabaseError::QueryFailed(format!("unexpected server_version_num '{version}'"))
        })?;

        let strategy = Self::for_server_version(version_num);
        info!(version_num, strategy = %strategy, "Negotiated row lock strategy");
        Ok(strategy)
    }

    /// Resolves a configured override or negotiates with the server
    pub async fn resolve(pool: &PgPool, forced: Option<Self>) -> Result<Self, DatabaseError> {
        match forced {
            Some(LockStrategy::Unlocked) => {
                warn!("Row locking disabled by configuration; concurrent consumption may oversell");
                Ok(LockStrategy::Unlocked)
            }
            Some(strategy) => Ok(strategy),
            None => Self::negotiate(pool).await,
        }
    }

    /// Clause appended to the query that picks the next lot to consume
    pub fn fifo_clause(&self) -> &'static str {
        match self {
            LockStrategy::SkipLocked => " FOR UPDATE SKIP LOCKED",
            LockStrategy::NoWait => " FOR UPDATE NOWAIT",
            LockStrategy::Exclusive => " FOR UPDATE",
            LockStrategy::Unlocked => "",
        }
    }

    /// Clause appended to queries that lock specific rows
    pub fn targeted_clause(&self) -> &'static str {
        match self {
            LockStrategy::Unlocked => "",
            _ => " FOR UPDATE",
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockStrategy::SkipLocked => "skip_locked",
            LockStrategy::NoWait => "no_wait",
            LockStrategy::Exclusive => "exclusive",
            LockStrategy::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}
