//! Consumption reversal
//!
//! Puts the units drawn for a document back into the lots they came from and
//! deletes the consumption rows, so a second reversal of the same document
//! finds nothing to do.

use std::collections::BTreeMap;

use core_kernel::{PortError, ProductId};
use tracing::{info, instrument, warn};

use crate::error::InventoryError;
use crate::ports::InventoryStore;
use crate::transaction::ConsumptionRef;

/// Units restored per product
pub type RestoredUnits = BTreeMap<ProductId, i64>;

/// Reverses every consumption recorded for `reference`
///
/// Afterwards the cached on-hand quantity of each touched product is reset
/// to the sum of its lots, healing any earlier drift. A row whose lot no
/// longer exists is deleted without restoring anything.
#[instrument(skip(store, reference), fields(reference = %reference))]
pub async fn reverse_consumption<S>(
    store: &mut S,
    reference: ConsumptionRef,
) -> Result<RestoredUnits, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    let operation = format!("reverse consumption for {reference}");
    let storage = |e: PortError| InventoryError::storage(&operation, e);

    let rows = store.transactions_for(reference).await.map_err(storage)?;
    let mut restored = RestoredUnits::new();

    for row in rows {
        match store.lock_lot(row.lot_id).await.map_err(storage)? {
            Some(lot) => {
                store
                    .set_lot_remaining(lot.id, lot.quantity_remaining + row.quantity_used)
                    .await
                    .map_err(storage)?;
                *restored.entry(lot.product_id).or_insert(0) += row.quantity_used;
            }
            None => {
                warn!(
                    transaction_id = %row.id,
                    lot_id = %row.lot_id,
                    quantity = row.quantity_used,
                    "Consumption row points at a missing lot; dropping without restore"
                );
            }
        }
        store.delete_transaction(row.id).await.map_err(storage)?;
    }

    for product_id in restored.keys() {
        let total = store.lot_total(*product_id).await.map_err(storage)?;
        store
            .set_quantity_on_hand(*product_id, total)
            .await
            .map_err(storage)?;
    }

    if !restored.is_empty() {
        info!(products = restored.len(), "Inventory consumption reversed");
    }
    Ok(restored)
}
