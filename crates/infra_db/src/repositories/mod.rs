//! Store implementations on the PostgreSQL unit of work
//!
//! Each module implements one domain port on [`crate::PgUnitOfWork`] and
//! maps between database rows and domain types.
//!
//! # Architecture
//!
//! Repositories follow these principles:
//! - Runtime-checked queries decoded through `FromRow` rows
//! - Every statement runs on the unit's open transaction
//! - Rows the caller will mutate are locked with the negotiated strategy

pub mod inventory;
pub mod journal;

pub use inventory::{LotRow, ProductRow, TransactionRow};
pub use journal::{ActivityRow, EntryRow, LineRow, TotalsRow};
