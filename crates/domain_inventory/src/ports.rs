//! Inventory Domain Ports
//!
//! This module defines the storage port of the inventory domain.
//!
//! # Architecture
//!
//! An [`InventoryStore`] is one open unit of work. Every method runs inside
//! that unit; nothing becomes visible to other units until the owner commits
//! it through [`core_kernel::TransactionScope`]. Adapters:
//!
//! - **Postgres Adapter**: `infra_db::PgUnitOfWork`, row locks on lots
//! - **Mock Adapter**: [`mock::InMemoryInventory`], for tests
//!
//! # Locking contract
//!
//! [`InventoryStore::next_open_lot`], [`InventoryStore::lock_lot`] and
//! [`InventoryStore::lots_from_source`] return rows the caller may mutate,
//! so adapters must lock them until the unit of work ends. A lock wait that
//! exceeds the adapter's bound is reported as [`PortError::Timeout`].

use async_trait::async_trait;
use core_kernel::{InventoryTransactionId, LotId, Money, PortError, ProductId};
use serde::{Deserialize, Serialize};

use crate::lot::{InventoryLot, LotSource, NewLot};
use crate::transaction::{ConsumptionRef, InventoryTransaction, NewInventoryTransaction};

/// The product fields the inventory domain reads
///
/// Products are owned elsewhere; `quantity_on_hand` is a cached mirror of
/// the lot totals and `unit_cost` is only a fallback estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub id: ProductId,
    pub name: String,
    pub quantity_on_hand: i64,
    pub unit_cost: Money,
}

/// Storage port for lots, consumption rows and the cached on-hand quantity
#[async_trait]
pub trait InventoryStore: Send {
    // ========================================================================
    // Products
    // ========================================================================

    /// Retrieves a product, `None` if it does not exist
    async fn find_product(&mut self, id: ProductId) -> Result<Option<ProductStock>, PortError>;

    /// Lists every known product id in ascending order
    async fn product_ids(&mut self) -> Result<Vec<ProductId>, PortError>;

    /// Overwrites the cached on-hand quantity
    async fn set_quantity_on_hand(&mut self, id: ProductId, quantity: i64) -> Result<(), PortError>;

    /// Adds `delta` to the cached on-hand quantity and returns the new value
    async fn adjust_quantity_on_hand(&mut self, id: ProductId, delta: i64) -> Result<i64, PortError>;

    // ========================================================================
    // Lots
    // ========================================================================

    /// Inserts a lot with `quantity_remaining == quantity_received`
    async fn insert_lot(&mut self, lot: NewLot) -> Result<InventoryLot, PortError>;

    /// Retrieves and locks one lot
    async fn lock_lot(&mut self, id: LotId) -> Result<Option<InventoryLot>, PortError>;

    /// Retrieves and locks the oldest lot of a product with stock remaining
    ///
    /// Order is `(created_at, id)` ascending.
    async fn next_open_lot(&mut self, product_id: ProductId) -> Result<Option<InventoryLot>, PortError>;

    /// Lists the open lots of a product in FIFO order without locking
    async fn open_lots(&mut self, product_id: ProductId) -> Result<Vec<InventoryLot>, PortError>;

    /// Retrieves and locks every lot created by one source document
    async fn lots_from_source(&mut self, source: LotSource) -> Result<Vec<InventoryLot>, PortError>;

    /// Sets the remaining quantity of a lot
    async fn set_lot_remaining(&mut self, id: LotId, quantity_remaining: i64) -> Result<(), PortError>;

    /// Deletes a lot that no consumption row references
    async fn delete_lot(&mut self, id: LotId) -> Result<(), PortError>;

    /// Sums the remaining quantity over all lots of a product
    async fn lot_total(&mut self, product_id: ProductId) -> Result<i64, PortError>;

    // ========================================================================
    // Consumption rows
    // ========================================================================

    /// Records one lot slice drained for a document
    async fn insert_transaction(
        &mut self,
        transaction: NewInventoryTransaction,
    ) -> Result<InventoryTransaction, PortError>;

    /// Lists the consumption rows of a document in insertion order
    async fn transactions_for(
        &mut self,
        reference: ConsumptionRef,
    ) -> Result<Vec<InventoryTransaction>, PortError>;

    /// Deletes one consumption row
    async fn delete_transaction(&mut self, id: InventoryTransactionId) -> Result<(), PortError>;
}

/// In-memory implementation of InventoryStore for testing
///
/// The whole state sits behind one async mutex. A unit of work holds the
/// mutex for its lifetime and mutates a private copy, which `commit` writes
/// back. Dropping the unit discards the copy.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{DomainPort, TransactionScope, UnitOfWorkFactory};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    /// Default bound on waiting for the store
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Everything the in-memory store holds
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct InventoryState {
        pub products: BTreeMap<ProductId, ProductStock>,
        pub lots: BTreeMap<LotId, InventoryLot>,
        pub transactions: BTreeMap<InventoryTransactionId, InventoryTransaction>,
        next_lot_id: i64,
        next_transaction_id: i64,
    }

    impl InventoryState {
        fn fifo_open_lots(&self, product_id: ProductId) -> Vec<InventoryLot> {
            let mut lots: Vec<InventoryLot> = self
                .lots
                .values()
                .filter(|lot| lot.product_id == product_id && lot.is_open())
                .cloned()
                .collect();
            lots.sort_by_key(InventoryLot::fifo_key);
            lots
        }

        fn product_mut(&mut self, id: ProductId) -> Result<&mut ProductStock, PortError> {
            self.products
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("product", id))
        }
    }

    /// Shared in-memory inventory
    #[derive(Debug, Clone)]
    pub struct InMemoryInventory {
        state: Arc<Mutex<InventoryState>>,
        lock_timeout: Duration,
    }

    impl Default for InMemoryInventory {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryInventory {
        /// Creates an empty store
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(InventoryState::default())),
                lock_timeout: DEFAULT_LOCK_TIMEOUT,
            }
        }

        /// Bounds how long `begin` waits for a concurrent unit of work
        pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
            self.lock_timeout = timeout;
            self
        }

        /// Pre-populates with products for testing
        pub async fn with_products(products: Vec<ProductStock>) -> Self {
            let store = Self::new();
            for product in products {
                store.add_product(product).await;
            }
            store
        }

        /// Registers or replaces a product
        pub async fn add_product(&self, product: ProductStock) {
            self.state.lock().await.products.insert(product.id, product);
        }

        /// Copies the committed state
        pub async fn snapshot(&self) -> InventoryState {
            self.state.lock().await.clone()
        }

        /// Opens a unit of work, waiting at most the configured timeout
        pub async fn begin_work(&self) -> Result<InMemoryInventoryWork, PortError> {
            let guard = tokio::time::timeout(self.lock_timeout, Arc::clone(&self.state).lock_owned())
                .await
                .map_err(|_| {
                    PortError::timeout("lock in-memory inventory", self.lock_timeout.as_millis() as u64)
                })?;
            let work = (*guard).clone();
            Ok(InMemoryInventoryWork { guard, work })
        }
    }

    impl DomainPort for InMemoryInventory {}

    #[async_trait]
    impl UnitOfWorkFactory for InMemoryInventory {
        type Work = InMemoryInventoryWork;

        async fn begin(&self) -> Result<Self::Work, PortError> {
            self.begin_work().await
        }
    }

    /// An open in-memory unit of work
    #[derive(Debug)]
    pub struct InMemoryInventoryWork {
        guard: OwnedMutexGuard<InventoryState>,
        work: InventoryState,
    }

    impl InMemoryInventoryWork {
        /// The uncommitted state as seen inside this unit
        pub fn state(&self) -> &InventoryState {
            &self.work
        }
    }

    #[async_trait]
    impl TransactionScope for InMemoryInventoryWork {
        async fn commit(self) -> Result<(), PortError> {
            let InMemoryInventoryWork { mut guard, work } = self;
            *guard = work;
            Ok(())
        }
    }

    #[async_trait]
    impl InventoryStore for InMemoryInventoryWork {
        async fn find_product(&mut self, id: ProductId) -> Result<Option<ProductStock>, PortError> {
            Ok(self.work.products.get(&id).cloned())
        }

        async fn product_ids(&mut self) -> Result<Vec<ProductId>, PortError> {
            Ok(self.work.products.keys().copied().collect())
        }

        async fn set_quantity_on_hand(&mut self, id: ProductId, quantity: i64) -> Result<(), PortError> {
            self.work.product_mut(id)?.quantity_on_hand = quantity;
            Ok(())
        }

        async fn adjust_quantity_on_hand(&mut self, id: ProductId, delta: i64) -> Result<i64, PortError> {
            let product = self.work.product_mut(id)?;
            product.quantity_on_hand += delta;
            Ok(product.quantity_on_hand)
        }

        async fn insert_lot(&mut self, lot: NewLot) -> Result<InventoryLot, PortError> {
            if !self.work.products.contains_key(&lot.product_id) {
                return Err(PortError::Conflict {
                    message: format!("lot references unknown product {}", lot.product_id),
                });
            }
            self.work.next_lot_id += 1;
            let lot = InventoryLot {
                id: LotId::new(self.work.next_lot_id),
                product_id: lot.product_id,
                quantity_received: lot.quantity,
                quantity_remaining: lot.quantity,
                unit_cost: lot.unit_cost,
                source: lot.source,
                is_opening_balance: lot.is_opening_balance,
                created_at: lot.created_at.unwrap_or_else(Utc::now),
            };
            self.work.lots.insert(lot.id, lot.clone());
            Ok(lot)
        }

        async fn lock_lot(&mut self, id: LotId) -> Result<Option<InventoryLot>, PortError> {
            Ok(self.work.lots.get(&id).cloned())
        }

        async fn next_open_lot(&mut self, product_id: ProductId) -> Result<Option<InventoryLot>, PortError> {
            Ok(self.work.fifo_open_lots(product_id).into_iter().next())
        }

        async fn open_lots(&mut self, product_id: ProductId) -> Result<Vec<InventoryLot>, PortError> {
            Ok(self.work.fifo_open_lots(product_id))
        }

        async fn lots_from_source(&mut self, source: LotSource) -> Result<Vec<InventoryLot>, PortError> {
            let mut lots: Vec<InventoryLot> = self
                .work
                .lots
                .values()
                .filter(|lot| lot.source == source)
                .cloned()
                .collect();
            lots.sort_by_key(InventoryLot::fifo_key);
            Ok(lots)
        }

        async fn set_lot_remaining(&mut self, id: LotId, quantity_remaining: i64) -> Result<(), PortError> {
            if quantity_remaining < 0 {
                return Err(PortError::validation_field(
                    "remaining quantity cannot be negative",
                    "quantity_remaining",
                ));
            }
            let lot = self
                .work
                .lots
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("inventory lot", id))?;
            lot.quantity_remaining = quantity_remaining;
            Ok(())
        }

        async fn delete_lot(&mut self, id: LotId) -> Result<(), PortError> {
            if self.work.transactions.values().any(|t| t.lot_id == id) {
                return Err(PortError::Conflict {
                    message: format!("lot {id} is referenced by consumption rows"),
                });
            }
            self.work
                .lots
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("inventory lot", id))
        }

        async fn lot_total(&mut self, product_id: ProductId) -> Result<i64, PortError> {
            Ok(self
                .work
                .lots
                .values()
                .filter(|lot| lot.product_id == product_id)
                .map(|lot| lot.quantity_remaining)
                .sum())
        }

        async fn insert_transaction(
            &mut self,
            transaction: NewInventoryTransaction,
        ) -> Result<InventoryTransaction, PortError> {
            if !self.work.lots.contains_key(&transaction.lot_id) {
                return Err(PortError::Conflict {
                    message: format!("consumption references unknown lot {}", transaction.lot_id),
                });
            }
            self.work.next_transaction_id += 1;
            let row = InventoryTransaction {
                id: InventoryTransactionId::new(self.work.next_transaction_id),
                lot_id: transaction.lot_id,
                product_id: transaction.product_id,
                quantity_used: transaction.quantity_used,
                unit_cost: transaction.unit_cost,
                total_cost: transaction.total_cost,
                reference: transaction.reference,
                created_at: Utc::now(),
            };
            self.work.transactions.insert(row.id, row.clone());
            Ok(row)
        }

        async fn transactions_for(
            &mut self,
            reference: ConsumptionRef,
        ) -> Result<Vec<InventoryTransaction>, PortError> {
            Ok(self
                .work
                .transactions
                .values()
                .filter(|t| t.reference == reference)
                .cloned()
                .collect())
        }

        async fn delete_transaction(&mut self, id: InventoryTransactionId) -> Result<(), PortError> {
            self.work
                .transactions
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("inventory transaction", id))
        }
    }
}
