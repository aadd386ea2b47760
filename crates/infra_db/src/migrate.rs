//! Schema migrations
//!
//! The SQL files under `migrations/` at the workspace root are embedded at
//! compile time.

use sqlx::migrate::Migrator;
use tracing::info;

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies every pending migration
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR.run(pool).await?;
    info!("Database migrations complete");
    Ok(())
}
