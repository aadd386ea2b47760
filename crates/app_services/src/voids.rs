//! Voiding documents
//!
//! A void undoes a document inside one unit of work: its journal entry is
//! voided through a reversing entry, consumed units go back to the lots they
//! came from, and lots the document received are withdrawn. Withdrawing is
//! refused once any unit of such a lot was consumed.

use std::collections::BTreeSet;

use core_kernel::{
    AdjustmentId, ArInvoiceId, MovementId, PortError, ProductId, PurchaseId, SaleId, TransactionScope,
    UnitOfWorkFactory,
};
use domain_inventory::{reverse_consumption, ConsumptionRef, InventoryError, InventoryLot, InventoryStore, LotSource};
use domain_ledger::{ledger, LedgerError};
use tracing::{info, instrument, warn};

use crate::documents::{VoidOutcome, VoidRequest};
use crate::error::WorkflowError;
use crate::service::PosService;
use crate::unit_of_work::Books;

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Voids a sale and puts its units back into stock
    pub async fn void_sale(&self, sale_id: SaleId, request: VoidRequest) -> Result<VoidOutcome, WorkflowError> {
        let reference = ConsumptionRef::Sale(sale_id);
        self.void_document(&reference.to_string(), Some(reference), None, &request)
            .await
    }

    /// Voids an AR invoice and puts its units back into stock
    pub async fn void_ar_invoice(
        &self,
        invoice_id: ArInvoiceId,
        request: VoidRequest,
    ) -> Result<VoidOutcome, WorkflowError> {
        let reference = ConsumptionRef::ArInvoice(invoice_id);
        self.void_document(&reference.to_string(), Some(reference), None, &request)
            .await
    }

    /// Voids a supplier purchase while none of its lots were sold from
    pub async fn void_purchase(&self, purchase_id: PurchaseId, request: VoidRequest) -> Result<VoidOutcome, WorkflowError> {
        let source = LotSource::Purchase(purchase_id);
        self.void_document(&source.to_string(), None, Some(source), &request)
            .await
    }

    /// Voids a stock adjustment in either direction
    pub async fn void_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        request: VoidRequest,
    ) -> Result<VoidOutcome, WorkflowError> {
        let reference = ConsumptionRef::Adjustment(adjustment_id);
        self.void_document(
            &reference.to_string(),
            Some(reference),
            Some(LotSource::Adjustment(adjustment_id)),
            &request,
        )
        .await
    }

    /// Voids a movement, on whichever side of it this branch was
    pub async fn void_transfer(
        &self,
        movement_id: MovementId,
        request: VoidRequest,
    ) -> Result<VoidOutcome, WorkflowError> {
        let reference = ConsumptionRef::Movement(movement_id);
        self.void_document(
            &reference.to_string(),
            Some(reference),
            Some(LotSource::Movement(movement_id)),
            &request,
        )
        .await
    }

    #[instrument(skip(self, consumed, received, request))]
    async fn void_document(
        &self,
        source_ref: &str,
        consumed: Option<ConsumptionRef>,
        received: Option<LotSource>,
        request: &VoidRequest,
    ) -> Result<VoidOutcome, WorkflowError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::MissingReason.into());
        }

        let mut work = self.begin().await?;
        let mut outcome = VoidOutcome::default();

        if let Some(entry) = ledger::find_by_source(&mut work, source_ref).await? {
            if entry.is_reversed() {
                return Err(WorkflowError::AlreadyVoided(format!(
                    "{source_ref} (journal entry {} was reversed)",
                    entry.id
                )));
            }
            outcome.reversal = ledger::void_entry(&mut work, entry.id, reason, request.voided_by).await?;
        }

        if let Some(reference) = consumed {
            outcome.restored = reverse_consumption(&mut work, reference).await?;
        }

        if let Some(source) = received {
            outcome.lots_removed = withdraw_lots(&mut work, source).await?;
        }

        if outcome.is_noop() {
            warn!("Nothing to void");
            return Err(WorkflowError::NotFound(format!("nothing left to void for {source_ref}")));
        }
        work.commit().await?;

        info!(
            reversal_id = ?outcome.reversal.as_ref().map(|e| e.id),
            restored_products = outcome.restored.len(),
            lots_removed = outcome.lots_removed.len(),
            "Document voided"
        );
        Ok(outcome)
    }
}

/// Deletes the untouched lots a document received and resyncs on-hand
async fn withdraw_lots<S>(store: &mut S, source: LotSource) -> Result<Vec<InventoryLot>, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    let operation = format!("withdraw lots of {source}");
    let storage = |e: PortError| InventoryError::storage(&operation, e);

    let lots = store.lots_from_source(source).await.map_err(storage)?;
    if lots.iter().any(|lot| !lot.is_untouched()) {
        return Err(WorkflowError::StockAlreadyConsumed(source.to_string()));
    }

    let mut products = BTreeSet::<ProductId>::new();
    for lot in &lots {
        store.delete_lot(lot.id).await.map_err(storage)?;
        products.insert(lot.product_id);
    }
    for product_id in products {
        let total = store.lot_total(product_id).await.map_err(storage)?;
        store.set_quantity_on_hand(product_id, total).await.map_err(storage)?;
    }
    Ok(lots)
}
