//! The unit of work the workflows run in
//!
//! A workflow touches lots and the journal of one business event together,
//! so its unit of work must implement both store ports. The Postgres
//! adapter's `PgUnitOfWork` does; for tests [`mock::InMemoryBooks`] pairs
//! the two in-memory stores.

use core_kernel::TransactionScope;
use domain_inventory::InventoryStore;
use domain_ledger::JournalStore;

/// Lots, consumption rows and journal entries inside one transaction
pub trait Books: InventoryStore + JournalStore + TransactionScope {}

impl<T> Books for T where T: InventoryStore + JournalStore + TransactionScope {}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use core_kernel::{
        DomainPort, InventoryTransactionId, JournalEntryId, LotId, PortError, ProductId,
        TransactionScope, UnitOfWorkFactory, UserId,
    };
    use domain_inventory::ports::mock::{InMemoryInventory, InMemoryInventoryWork, InventoryState};
    use domain_inventory::{
        ConsumptionRef, InventoryLot, InventoryStore, InventoryTransaction, LotSource, NewInventoryTransaction,
        NewLot, ProductStock,
    };
    use domain_ledger::ports::mock::{InMemoryJournal, InMemoryJournalWork, JournalState};
    use domain_ledger::{
        AccountFilter, AccountTotals, AggregateWindow, EntryDraft, JournalEntry, JournalStore, PostedLine,
    };
    use std::time::Duration;

    /// In-memory inventory and journal opened together
    ///
    /// The inventory is always locked before the journal, so two units of
    /// work cannot deadlock each other.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryBooks {
        inventory: InMemoryInventory,
        journal: InMemoryJournal,
    }

    impl InMemoryBooks {
        pub fn new() -> Self {
            Self::default()
        }

        /// Wraps existing stores, e.g. one seeded by a test builder
        pub fn from_parts(inventory: InMemoryInventory, journal: InMemoryJournal) -> Self {
            Self { inventory, journal }
        }

        /// Bounds how long `begin` waits on each store
        pub fn with_lock_timeout(self, timeout: Duration) -> Self {
            Self {
                inventory: self.inventory.with_lock_timeout(timeout),
                journal: self.journal.with_lock_timeout(timeout),
            }
        }

        /// Registers or replaces a product
        pub async fn add_product(&self, product: ProductStock) {
            self.inventory.add_product(product).await;
        }

        pub async fn inventory_snapshot(&self) -> InventoryState {
            self.inventory.snapshot().await
        }

        pub async fn journal_snapshot(&self) -> JournalState {
            self.journal.snapshot().await
        }
    }

    impl DomainPort for InMemoryBooks {}

    #[async_trait]
    impl UnitOfWorkFactory for InMemoryBooks {
        type Work = InMemoryBooksWork;

        async fn begin(&self) -> Result<Self::Work, PortError> {
            let inventory = self.inventory.begin_work().await?;
            let journal = self.journal.begin_work().await?;
            Ok(InMemoryBooksWork { inventory, journal })
        }
    }

    /// An open unit of work over both in-memory stores
    #[derive(Debug)]
    pub struct InMemoryBooksWork {
        inventory: InMemoryInventoryWork,
        journal: InMemoryJournalWork,
    }

    #[async_trait]
    impl TransactionScope for InMemoryBooksWork {
        async fn commit(self) -> Result<(), PortError> {
            self.inventory.commit().await?;
            self.journal.commit().await
        }
    }

    #[async_trait]
    impl InventoryStore for InMemoryBooksWork {
        async fn find_product(&mut self, id: ProductId) -> Result<Option<ProductStock>, PortError> {
            self.inventory.find_product(id).await
        }

        async fn product_ids(&mut self) -> Result<Vec<ProductId>, PortError> {
            self.inventory.product_ids().await
        }

        async fn set_quantity_on_hand(&mut self, id: ProductId, quantity: i64) -> Result<(), PortError> {
            self.inventory.set_quantity_on_hand(id, quantity).await
        }

        async fn adjust_quantity_on_hand(&mut self, id: ProductId, delta: i64) -> Result<i64, PortError> {
            self.inventory.adjust_quantity_on_hand(id, delta).await
        }

        async fn insert_lot(&mut self, lot: NewLot) -> Result<InventoryLot, PortError> {
            self.inventory.insert_lot(lot).await
        }

        async fn lock_lot(&mut self, id: LotId) -> Result<Option<InventoryLot>, PortError> {
            self.inventory.lock_lot(id).await
        }

        async fn next_open_lot(&mut self, product_id: ProductId) -> Result<Option<InventoryLot>, PortError> {
            self.inventory.next_open_lot(product_id).await
        }

        async fn open_lots(&mut self, product_id: ProductId) -> Result<Vec<InventoryLot>, PortError> {
            self.inventory.open_lots(product_id).await
        }

        async fn lots_from_source(&mut self, source: LotSource) -> Result<Vec<InventoryLot>, PortError> {
            self.inventory.lots_from_source(source).await
        }

        async fn set_lot_remaining(&mut self, id: LotId, quantity_remaining: i64) -> Result<(), PortError> {
            self.inventory.set_lot_remaining(id, quantity_remaining).await
        }

        async fn delete_lot(&mut self, id: LotId) -> Result<(), PortError> {
            self.inventory.delete_lot(id).await
        }

        async fn lot_total(&mut self, product_id: ProductId) -> Result<i64, PortError> {
            self.inventory.lot_total(product_id).await
        }

        async fn insert_transaction(
            &mut self,
            transaction: NewInventoryTransaction,
        ) -> Result<InventoryTransaction, PortError> {
            self.inventory.insert_transaction(transaction).await
        }

        async fn transactions_for(
            &mut self,
            reference: ConsumptionRef,
        ) -> Result<Vec<InventoryTransaction>, PortError> {
            self.inventory.transactions_for(reference).await
        }

        async fn delete_transaction(&mut self, id: InventoryTransactionId) -> Result<(), PortError> {
            self.inventory.delete_transaction(id).await
        }
    }

    #[async_trait]
    impl JournalStore for InMemoryBooksWork {
        async fn insert_entry(&mut self, draft: EntryDraft) -> Result<JournalEntry, PortError> {
            self.journal.insert_entry(draft).await
        }

        async fn lock_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
            self.journal.lock_entry(id).await
        }

        async fn set_annotations(
            &mut self,
            id: JournalEntryId,
            description: &str,
            void_reason: Option<&str>,
        ) -> Result<(), PortError> {
            self.journal.set_annotations(id, description, void_reason).await
        }

        async fn mark_voided(
            &mut self,
            id: JournalEntryId,
            voided_at: DateTime<Utc>,
            voided_by: Option<UserId>,
            reason: &str,
        ) -> Result<(), PortError> {
            self.journal.mark_voided(id, voided_at, voided_by, reason).await
        }

        async fn find_by_source(&mut self, source_ref: &str) -> Result<Option<JournalEntry>, PortError> {
            self.journal.find_by_source(source_ref).await
        }

        async fn account_totals(
            &mut self,
            filter: &AccountFilter,
            window: &AggregateWindow,
        ) -> Result<Vec<AccountTotals>, PortError> {
            self.journal.account_totals(filter, window).await
        }

        async fn account_activity(
            &mut self,
            account_code: &str,
            window: &AggregateWindow,
        ) -> Result<Vec<PostedLine>, PortError> {
            self.journal.account_activity(account_code, window).await
        }
    }
}
