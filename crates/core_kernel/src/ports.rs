//! Ports and Adapters Infrastructure
//!
//! This module provides the foundational types for the hexagonal
//! (ports and adapters) layout shared by the domain crates.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! │        (sale / purchase / adjustment / void workflows)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Port Traits                             │
//! │          (InventoryStore, JournalStore, ...)                 │
//! │   Defined in each domain, depend only on core_kernel         │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  Postgres adapter │     │ In-memory adapter│
//!         │     (infra_db)    │     │  (mock feature)  │
//!         └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Units of work
//!
//! Store traits take `&mut self`: an implementation is one open transaction.
//! A [`UnitOfWorkFactory`] opens it, the caller performs every mutation of a
//! business event through it, then calls [`TransactionScope::commit`].
//! Dropping the work without committing rolls everything back.
//!
//! ```rust,ignore
//! let mut work = factory.begin().await?;
//! let consumption = engine.consume(&mut work, product, 3, reference).await?;
//! ledger::post(&mut work, draft).await?;
//! work.commit().await?;
//! ```

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for port operations
///
/// Provides a unified error type that all port implementations must use,
/// ensuring consistent error handling across the Postgres and in-memory
/// adapters.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The operation conflicts with existing data
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lock or statement wait exceeded its bound
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Validation error with field information
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        PortError::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. } | PortError::Timeout { .. })
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// Returns the bounded wait in milliseconds when this is a timeout
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            PortError::Timeout { duration_ms, .. } => Some(*duration_ms),
            _ => None,
        }
    }
}

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// An open unit of work that can be made durable
///
/// Implementations roll back on drop when `commit` was never called.
#[async_trait]
pub trait TransactionScope: Send + Sized {
    /// Makes every change performed through this scope durable
    async fn commit(self) -> Result<(), PortError>;
}

/// Opens units of work against one backing store
#[async_trait]
pub trait UnitOfWorkFactory: DomainPort {
    /// The transaction type handed to the domain operations
    type Work: TransactionScope;

    /// Begins a new unit of work
    async fn begin(&self) -> Result<Self::Work, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient() {
        let err = PortError::timeout("lock inventory_lots", 5_000);
        assert!(err.is_transient());
        assert_eq!(err.timeout_ms(), Some(5_000));
        assert_eq!(err.to_string(), "Timeout after 5000ms: lock inventory_lots");
    }

    #[test]
    fn test_not_found_helper() {
        let err = PortError::not_found("product", 42);
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
