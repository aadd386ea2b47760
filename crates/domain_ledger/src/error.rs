//! Ledger domain errors

use core_kernel::{JournalEntryId, Money, PortError};
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Debits and credits differ
    #[error("Unbalanced entry: debits={debits}, credits={credits}")]
    UnbalancedEntry {
        debits: Money,
        credits: Money,
    },

    /// Entry has no lines
    #[error("Journal entry has no lines")]
    EmptyEntry,

    /// A line is malformed
    #[error("Invalid line {line}: {reason}")]
    InvalidLine {
        line: usize,
        reason: String,
    },

    /// Journal entry not found
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Entry was voided before
    #[error("Journal entry already voided: {0}")]
    AlreadyVoided(JournalEntryId),

    /// Voiding requires a reason
    #[error("A void reason is required")]
    MissingReason,

    /// An entry row lock could not be acquired within the bounded wait
    #[error("Lock wait exceeded {waited_ms}ms: {operation}")]
    LockTimeout {
        operation: String,
        waited_ms: u64,
    },

    /// Any other storage failure
    #[error("Ledger storage failure: {0}")]
    Database(#[source] PortError),
}

impl From<PortError> for LedgerError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Timeout { operation, duration_ms } => LedgerError::LockTimeout {
                operation,
                waited_ms: duration_ms,
            },
            other => LedgerError::Database(other),
        }
    }
}

impl LedgerError {
    /// Returns true for errors raised by entry validation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::UnbalancedEntry { .. }
                | LedgerError::EmptyEntry
                | LedgerError::InvalidLine { .. }
                | LedgerError::MissingReason
        )
    }
}
