//! Operator command errors

use app_services::WorkflowError;
use infra_db::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for the error
    ///
    /// `75` (EX_TEMPFAIL) tells a scheduler the command may be retried.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Workflow(e) if e.is_retryable() => 75,
            CliError::Input(_) | CliError::Json(_) => 65,
            _ => 1,
        }
    }
}
