//! POS inventory and books administration binary
//!
//! # Environment Variables
//!
//! * `POS_DATABASE__URL` - PostgreSQL connection string (`DATABASE_URL` or `--database-url` override it)
//! * `POS_DATABASE__LOCK_TIMEOUT` - Row lock wait bound in milliseconds
//! * `POS_DATABASE__LOCK_STRATEGY` - Forces `skip_locked`, `no_wait`, `exclusive` or `unlocked`
//! * `POS_SERVICES__VAT_PERCENTAGE` - VAT rate, e.g. `12`
//! * `POS_SERVICES__IMPORT_BATCH_SIZE` - Rows per opening balance batch
//! * `POS_LOG_LEVEL` - trace, debug, info, warn, error (default: info)

use std::process::ExitCode;

use app_services::PosService;
use clap::Parser;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgUnitOfWorkFactory};
use interface_cli::{execute, telemetry, AppConfig, Cli, CliError, Command};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    telemetry::init_tracing(&log_level, cli.json_logs || config.json_logs)?;

    let database = match cli.database_url {
        Some(url) => DatabaseConfig { url, ..config.database },
        None => config.database,
    };

    match run(cli.command, database, config.services).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            Ok(ExitCode::from(err.exit_code() as u8))
        }
    }
}

async fn run(
    command: Command,
    database: DatabaseConfig,
    services: app_services::ServiceConfig,
) -> Result<serde_json::Value, CliError> {
    let pool = create_pool(&database).await?;

    match command {
        Command::Migrate => {
            run_migrations(&pool).await?;
            Ok(json!({ "migrated": true }))
        }
        Command::Books(command) => {
            let factory = PgUnitOfWorkFactory::connect(pool, &database).await?;
            tracing::info!(lock_strategy = ?factory.lock_strategy(), "Connected");
            execute(&PosService::new(factory, services), command).await
        }
    }
}
