//! The POS service
//!
//! [`PosService`] owns a unit-of-work factory and runs every business event
//! inside one unit of work: lot movements and the journal entry of the event
//! commit together or not at all. The workflows themselves live in the
//! sibling modules as further `impl` blocks.

use std::collections::BTreeMap;

use chrono::Utc;
use core_kernel::{PortError, ProductId, UnitOfWorkFactory};
use domain_inventory::{
    lot_summary, reconcile, reconcile_all, ConsumptionRef, FifoEngine, InventoryError, InventoryStore, LotSource,
    LotSummary, ProductStock, ReconciliationReport,
};
use domain_ledger::ledger::{self, account_ledger};
use domain_ledger::{AccountBalance, AccountFilter, AccountLedger, AggregateWindow, JournalStore};
use tracing::instrument;

use crate::accounts::AccountMap;
use crate::config::ServiceConfig;
use crate::error::WorkflowError;
use crate::unit_of_work::Books;

/// Runs the business workflows against one backing store
#[derive(Debug, Clone)]
pub struct PosService<F> {
    factory: F,
    config: ServiceConfig,
    engine: FifoEngine,
}

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    pub fn new(factory: F, config: ServiceConfig) -> Self {
        let engine = FifoEngine::new(config.fifo);
        Self {
            factory,
            config,
            engine,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub(crate) fn accounts(&self) -> &AccountMap {
        &self.config.accounts
    }

    pub(crate) fn engine(&self) -> &FifoEngine {
        &self.engine
    }

    pub(crate) async fn begin(&self) -> Result<F::Work, WorkflowError> {
        Ok(self.factory.begin().await?)
    }

    // ========================================================================
    // Read side
    // ========================================================================

    /// Compares cached on-hand with lot totals
    ///
    /// With a product, that product is always reported. Without one, only
    /// drifted products are.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, product_id: Option<ProductId>) -> Result<Vec<ReconciliationReport>, WorkflowError> {
        let mut work = self.begin().await?;
        let reports = match product_id {
            Some(id) => vec![reconcile(&mut work, id).await?],
            None => reconcile_all(&mut work).await?,
        };
        Ok(reports)
    }

    /// Open lots of a product in FIFO order
    pub async fn lots(&self, product_id: ProductId) -> Result<Vec<LotSummary>, WorkflowError> {
        let mut work = self.begin().await?;
        require_product(&mut work, product_id).await?;
        Ok(lot_summary(&mut work, product_id, Utc::now()).await?)
    }

    /// Debit, credit and net per account over reportable entries
    pub async fn balances(
        &self,
        filter: &AccountFilter,
        window: &AggregateWindow,
    ) -> Result<BTreeMap<String, AccountBalance>, WorkflowError> {
        let mut work = self.begin().await?;
        Ok(ledger::aggregate(&mut work, filter, window).await?)
    }

    /// Running-balance ledger of one account
    pub async fn account_ledger(
        &self,
        account_code: &str,
        window: &AggregateWindow,
    ) -> Result<AccountLedger, WorkflowError> {
        let mut work = self.begin().await?;
        Ok(account_ledger(&mut work, account_code, window).await?)
    }
}

/// Loads a product or fails with `NotFound`
pub(crate) async fn require_product<S>(store: &mut S, product_id: ProductId) -> Result<ProductStock, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    store
        .find_product(product_id)
        .await
        .map_err(|e| InventoryError::storage(format!("load {product_id}"), e))?
        .ok_or_else(|| InventoryError::NotFound(format!("product {product_id}")).into())
}

/// Moves the cached on-hand quantity by `delta`
pub(crate) async fn shift_on_hand<S>(store: &mut S, product_id: ProductId, delta: i64) -> Result<i64, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    store
        .adjust_quantity_on_hand(product_id, delta)
        .await
        .map_err(|e: PortError| InventoryError::storage(format!("shift on-hand of {product_id} by {delta}"), e).into())
}

/// Fails when a document already left a trace in the books
///
/// An active journal entry for `source_ref` counts, and so do consumption
/// rows or lots still carrying the document. The stock checks catch
/// documents that post no entry, such as movements or free deliveries.
pub(crate) async fn ensure_unrecorded<S>(
    store: &mut S,
    source_ref: &str,
    consumed: Option<ConsumptionRef>,
    received: Option<LotSource>,
) -> Result<(), WorkflowError>
where
    S: InventoryStore + JournalStore + ?Sized,
{
    if let Some(entry) = ledger::find_by_source(&mut *store, source_ref).await? {
        if !entry.is_reversed() {
            return Err(WorkflowError::AlreadyRecorded(format!(
                "{source_ref} (journal entry {})",
                entry.id
            )));
        }
    }

    let storage = |e: PortError| InventoryError::storage(format!("check {source_ref}"), e);
    if let Some(reference) = consumed {
        let rows = store.transactions_for(reference).await.map_err(storage)?;
        if !rows.is_empty() {
            return Err(WorkflowError::AlreadyRecorded(format!(
                "{source_ref} ({} consumption rows)",
                rows.len()
            )));
        }
    }
    if let Some(source) = received {
        let lots = store.lots_from_source(source).await.map_err(storage)?;
        if !lots.is_empty() {
            return Err(WorkflowError::AlreadyRecorded(format!("{source_ref} ({} lots)", lots.len())));
        }
    }
    Ok(())
}
