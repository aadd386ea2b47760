//! Command line surface and dispatch

use std::path::{Path, PathBuf};

use app_services::{Books, OpeningBalanceRow, PosService};
use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{ArgAction, Parser, Subcommand};
use core_kernel::{ProductId, UnitOfWorkFactory};
use domain_ledger::{AccountFilter, AggregateWindow};
use serde_json::Value;
use tracing::info;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "inventory-admin", about = "Inspect and repair POS stock and books", version)]
pub struct Cli {
    /// Overrides `POS_DATABASE__URL`
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Overrides `POS_LOG_LEVEL`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[arg(long, global = true, action = ArgAction::SetTrue, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Applies pending schema migrations
    Migrate,
    #[command(flatten)]
    Books(BooksCommand),
}

/// Commands that run against the books through the workflows
#[derive(Debug, Subcommand)]
pub enum BooksCommand {
    /// Compares cached on-hand quantities with lot totals
    Reconcile {
        /// Report this product even when it is balanced
        #[arg(long)]
        product: Option<ProductId>,
    },
    /// Lists the open lots of a product in FIFO order
    Lots { product: ProductId },
    /// Debit, credit and net per account
    Balances {
        #[arg(long)]
        account: Option<String>,
        /// First day included (UTC)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day included (UTC)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Running-balance ledger of one account
    Ledger {
        account: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Imports opening stock from a JSON array of rows
    Import { file: PathBuf },
}

/// Runs a books command and returns its JSON output
pub async fn execute<F>(service: &PosService<F>, command: BooksCommand) -> Result<Value, CliError>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    let output = match command {
        BooksCommand::Reconcile { product } => {
            let reports = service.reconcile(product).await?;
            info!(reported = reports.len(), "Reconciliation finished");
            serde_json::to_value(reports)?
        }
        BooksCommand::Lots { product } => serde_json::to_value(service.lots(product).await?)?,
        BooksCommand::Balances { account, from, to } => {
            let filter = account.map(AccountFilter::code).unwrap_or_default();
            serde_json::to_value(service.balances(&filter, &window(from, to)?).await?)?
        }
        BooksCommand::Ledger { account, from, to } => {
            serde_json::to_value(service.account_ledger(&account, &window(from, to)?).await?)?
        }
        BooksCommand::Import { file } => {
            let rows = read_rows(&file).await?;
            serde_json::to_value(service.import_opening_balances(&rows).await)?
        }
    };
    Ok(output)
}

/// Turns inclusive calendar days into a half-open UTC window
pub fn window(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<AggregateWindow, CliError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(CliError::Input(format!("--from {from} is after --to {to}")));
        }
    }
    let midnight = |day: NaiveDate| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    let end = match to {
        Some(day) => Some(
            day.checked_add_days(Days::new(1))
                .ok_or_else(|| CliError::Input(format!("--to {day} is out of range")))?,
        ),
        None => None,
    };

    Ok(AggregateWindow {
        start: from.map(midnight),
        end: end.map(midnight),
    })
}

async fn read_rows(path: &Path) -> Result<Vec<OpeningBalanceRow>, CliError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
