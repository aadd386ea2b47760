//! Operator configuration
//!
//! Read from the environment with the `POS_` prefix and `__` between nested
//! keys, e.g. `POS_DATABASE__URL`, `POS_DATABASE__LOCK_TIMEOUT=2000` or
//! `POS_SERVICES__VAT_PERCENTAGE=12`. A `.env` file is honoured by the
//! binary through `dotenvy`.

use app_services::ServiceConfig;
use config::{Config, ConfigError, Environment};
use infra_db::DatabaseConfig;
use serde::Deserialize;

/// Everything the operator binary needs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub services: ServiceConfig,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::new("postgres://localhost/pos"),
            services: ServiceConfig::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(environment())
    }

    /// Loads configuration from an environment source and validates it
    pub fn load(source: Environment) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder().add_source(source).build()?.try_deserialize()?;
        config.services.validate().map_err(ConfigError::Message)?;
        Ok(config)
    }
}

/// The `POS_` environment source
pub fn environment() -> Environment {
    Environment::with_prefix("POS")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
