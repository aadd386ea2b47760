//! Operator command line for the POS accounting core
//!
//! `inventory-admin` wires the Postgres unit of work into the workflows and
//! prints every result as JSON on stdout. Logs go to stderr.
//!
//! ```bash
//! inventory-admin migrate
//! inventory-admin reconcile --product PRD-12
//! inventory-admin balances --account 101 --from 2026-01-01 --to 2026-01-31
//! inventory-admin import opening-stock.json
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod telemetry;

pub use commands::{execute, BooksCommand, Cli, Command};
pub use config::AppConfig;
pub use error::CliError;
