//! Workflow errors

use core_kernel::{MoneyError, PortError};
use domain_inventory::InventoryError;
use domain_ledger::LedgerError;
use thiserror::Error;

/// Errors raised by the business workflows
///
/// Every workflow runs in one unit of work, so any error means nothing was
/// committed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),

    #[error("Storage failure: {0}")]
    Port(#[from] PortError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An active journal entry already exists for the document
    #[error("Document already recorded: {0}")]
    AlreadyRecorded(String),

    /// The document was voided or reversed before
    #[error("Document already voided: {0}")]
    AlreadyVoided(String),

    /// Stock received by the document was consumed since
    #[error("Stock from {0} was already consumed and cannot be withdrawn")]
    StockAlreadyConsumed(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// Returns true if retrying the whole workflow may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Inventory(e) => e.is_retryable(),
            WorkflowError::Ledger(LedgerError::LockTimeout { .. }) => true,
            WorkflowError::Ledger(LedgerError::Database(e)) => e.is_transient(),
            WorkflowError::Port(e) => e.is_transient(),
            _ => false,
        }
    }
}
