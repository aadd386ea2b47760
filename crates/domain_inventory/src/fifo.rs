//! FIFO consumption engine
//!
//! Drains the oldest lots of a product first and records one consumption
//! row per lot slice. The engine does not care which document consumes the
//! stock; the [`ConsumptionRef`] is stored on every row so the reversal
//! engine can find them again.

use core_kernel::{Money, PortError, ProductId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::InventoryError;
use crate::ports::InventoryStore;
use crate::transaction::{ConsumptionRef, InventoryTransaction, NewInventoryTransaction};

/// Upper bound on lots drained by a single call
pub const DEFAULT_MAX_LOTS_PER_CALL: usize = 10_000;

/// Tunables of the consumption loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FifoPolicy {
    pub max_lots_per_call: usize,
}

impl Default for FifoPolicy {
    fn default() -> Self {
        Self {
            max_lots_per_call: DEFAULT_MAX_LOTS_PER_CALL,
        }
    }
}

/// Outcome of a successful consumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consumption {
    pub product_id: ProductId,
    pub quantity: i64,
    pub total_cost: Money,
    pub transactions: Vec<InventoryTransaction>,
}

impl Consumption {
    /// Number of lots drained
    pub fn lots_touched(&self) -> usize {
        self.transactions.len()
    }

    /// Average cost per consumed unit
    pub fn average_unit_cost(&self) -> Money {
        self.total_cost.per_unit(self.quantity).unwrap_or_default()
    }
}

/// Read-only estimate of what a consumption would cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostPreview {
    pub requested: i64,
    /// Units covered by the open lots, at most `requested`
    pub available: i64,
    pub estimated_cost: Money,
}

impl CostPreview {
    pub fn is_fully_covered(&self) -> bool {
        self.available >= self.requested
    }
}

/// Drains lots oldest-first
#[derive(Debug, Clone, Default)]
pub struct FifoEngine {
    policy: FifoPolicy,
}

impl FifoEngine {
    pub fn new(policy: FifoPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FifoPolicy {
        &self.policy
    }

    /// Consumes `quantity` units of a product for a document
    ///
    /// Each lot is locked by the store as it is reached. On `OutOfStock`
    /// nothing was mutated. On `PartialStockDepletion`, fragmentation, cost
    /// overflow or a storage failure some lots may already be drained in
    /// this unit of work and the caller must roll it back.
    #[instrument(skip(self, store, product_id, reference), fields(product_id = %product_id, reference = %reference))]
    pub async fn consume<S>(
        &self,
        store: &mut S,
        product_id: ProductId,
        quantity: i64,
        reference: ConsumptionRef,
    ) -> Result<Consumption, InventoryError>
    where
        S: InventoryStore + ?Sized,
    {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(format!(
                "consumed quantity must be positive, got {quantity}"
            )));
        }

        let operation = format!("consume {product_id} x {quantity} for {reference}");
        let storage = |e: PortError| InventoryError::storage(&operation, e);
        let overflow = InventoryError::cost_overflow(product_id);

        if store.find_product(product_id).await.map_err(storage)?.is_none() {
            return Err(InventoryError::NotFound(format!("product {product_id}")));
        }

        let mut remaining = quantity;
        let mut total_cost = Money::zero();
        let mut transactions = Vec::new();

        while remaining > 0 {
            if transactions.len() >= self.policy.max_lots_per_call {
                warn!(
                    lots_touched = transactions.len(),
                    remaining, "Consumption aborted on lot fragmentation"
                );
                return Err(InventoryError::ExcessiveFragmentation {
                    product_id,
                    max_lots: self.policy.max_lots_per_call,
                });
            }

            let lot = match store.next_open_lot(product_id).await.map_err(storage)? {
                Some(lot) => lot,
                None if transactions.is_empty() => {
                    return Err(InventoryError::OutOfStock {
                        product_id,
                        requested: quantity,
                    });
                }
                None => {
                    warn!(consumed = quantity - remaining, "Lots depleted mid-consumption");
                    return Err(InventoryError::PartialStockDepletion {
                        product_id,
                        requested: quantity,
                        consumed: quantity - remaining,
                    });
                }
            };

            let take = lot.quantity_remaining.min(remaining);
            if take <= 0 {
                return Err(storage(PortError::internal(format!(
                    "lot {} returned as open with remaining {}",
                    lot.id, lot.quantity_remaining
                ))));
            }
            let slice_cost = lot.unit_cost.checked_times(take).map_err(&overflow)?;
            total_cost = total_cost.checked_add(slice_cost).map_err(&overflow)?;

            let row = store
                .insert_transaction(NewInventoryTransaction {
                    lot_id: lot.id,
                    product_id,
                    quantity_used: take,
                    unit_cost: lot.unit_cost,
                    total_cost: slice_cost,
                    reference,
                })
                .await
                .map_err(storage)?;
            store
                .set_lot_remaining(lot.id, lot.quantity_remaining - take)
                .await
                .map_err(storage)?;

            debug!(lot_id = %lot.id, take, unit_cost = %lot.unit_cost, "Drained lot slice");

            remaining -= take;
            transactions.push(row);
        }

        info!(
            quantity,
            total_cost = %total_cost,
            lots = transactions.len(),
            "Inventory consumed"
        );

        Ok(Consumption {
            product_id,
            quantity,
            total_cost,
            transactions,
        })
    }

    /// Estimates the FIFO cost of `quantity` units without locking or mutating
    ///
    /// The estimate stops at the available stock.
    pub async fn preview_cost<S>(
        &self,
        store: &mut S,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CostPreview, InventoryError>
    where
        S: InventoryStore + ?Sized,
    {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(format!(
                "previewed quantity must be positive, got {quantity}"
            )));
        }

        let lots = store
            .open_lots(product_id)
            .await
            .map_err(|e| InventoryError::storage(format!("preview {product_id}"), e))?;

        let overflow = InventoryError::cost_overflow(product_id);
        let mut remaining = quantity;
        let mut estimated_cost = Money::zero();
        for lot in lots.iter().take(self.policy.max_lots_per_call) {
            if remaining == 0 {
                break;
            }
            let take = lot.quantity_remaining.min(remaining);
            let slice_cost = lot.unit_cost.checked_times(take).map_err(&overflow)?;
            estimated_cost = estimated_cost.checked_add(slice_cost).map_err(&overflow)?;
            remaining -= take;
        }

        Ok(CostPreview {
            requested: quantity,
            available: quantity - remaining,
            estimated_cost,
        })
    }
}
