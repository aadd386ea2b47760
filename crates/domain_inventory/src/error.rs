//! Inventory domain errors

use core_kernel::{MoneyError, PortError, ProductId};
use thiserror::Error;

/// Errors that can occur in the inventory domain
///
/// Validation variants are raised before any mutation. The stock-shortage
/// and storage variants may be raised after lots were already drained in
/// the current unit of work; the caller must drop it to roll back.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Quantity is zero or negative
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Unit cost is negative or unparseable
    #[error("Invalid unit cost: {0}")]
    InvalidCost(String),

    /// Product or lot does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No lot with remaining stock exists for the product
    #[error("No inventory lots available for product {product_id} (requested {requested})")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
    },

    /// Lots ran out after part of the quantity was already drained
    #[error("Inventory lots depleted mid-transaction for product {product_id}: consumed {consumed}/{requested}")]
    PartialStockDepletion {
        product_id: ProductId,
        requested: i64,
        consumed: i64,
    },

    /// More lots would be touched than a single call may drain
    #[error("Excessive lot fragmentation for product {product_id}: more than {max_lots} lots required")]
    ExcessiveFragmentation {
        product_id: ProductId,
        max_lots: usize,
    },

    /// A cost computation left the decimal range
    #[error("Cost of product {product_id} cannot be computed: {source}")]
    CostOverflow {
        product_id: ProductId,
        #[source]
        source: MoneyError,
    },

    /// A lot row lock could not be acquired within the bounded wait
    #[error("Lock wait exceeded {waited_ms}ms during {operation}")]
    LockTimeout {
        operation: String,
        waited_ms: u64,
    },

    /// Any other storage failure, with the operation that hit it
    #[error("Storage failure during {operation}: {source}")]
    Database {
        operation: String,
        #[source]
        source: PortError,
    },
}

impl InventoryError {
    /// Wraps a port error, keeping lock timeouts distinguishable
    pub fn storage(operation: impl Into<String>, source: PortError) -> Self {
        let operation = operation.into();
        match source {
            PortError::Timeout { duration_ms, .. } => InventoryError::LockTimeout {
                operation,
                waited_ms: duration_ms,
            },
            PortError::NotFound { entity_type, id } => {
                InventoryError::NotFound(format!("{entity_type} {id}"))
            }
            source => InventoryError::Database { operation, source },
        }
    }

    /// Wraps an arithmetic failure while costing a product
    pub fn cost_overflow(product_id: ProductId) -> impl Fn(MoneyError) -> Self {
        move |source| InventoryError::CostOverflow { product_id, source }
    }

    /// Returns true for shortages detected while draining lots
    pub fn is_stock_shortage(&self) -> bool {
        matches!(
            self,
            InventoryError::OutOfStock { .. } | InventoryError::PartialStockDepletion { .. }
        )
    }

    /// Returns true if retrying the whole unit of work may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InventoryError::LockTimeout { .. } => true,
            InventoryError::Database { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
