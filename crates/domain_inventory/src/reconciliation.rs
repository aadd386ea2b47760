//! Reconciliation of cached on-hand quantities against lot totals
//!
//! Read-only. Drift is reported, never repaired here; reversal resyncs the
//! products it touches and operators fix the rest.

use core_kernel::{PortError, ProductId};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::error::InventoryError;
use crate::ports::InventoryStore;

/// Comparison of one product's cached quantity with its lots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub product_id: ProductId,
    pub on_hand: i64,
    pub lot_total: i64,
    /// `on_hand - lot_total`
    pub discrepancy: i64,
    pub is_balanced: bool,
}

impl ReconciliationReport {
    fn new(product_id: ProductId, on_hand: i64, lot_total: i64) -> Self {
        let discrepancy = on_hand - lot_total;
        Self {
            product_id,
            on_hand,
            lot_total,
            discrepancy,
            is_balanced: discrepancy == 0,
        }
    }
}

/// Reconciles one product
#[instrument(skip(store))]
pub async fn reconcile<S>(store: &mut S, product_id: ProductId) -> Result<ReconciliationReport, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    let operation = format!("reconcile {product_id}");
    let storage = |e: PortError| InventoryError::storage(&operation, e);

    let product = store
        .find_product(product_id)
        .await
        .map_err(storage)?
        .ok_or_else(|| InventoryError::NotFound(format!("product {product_id}")))?;
    let lot_total = store.lot_total(product_id).await.map_err(storage)?;

    let report = ReconciliationReport::new(product_id, product.quantity_on_hand, lot_total);
    if !report.is_balanced {
        warn!(
            on_hand = report.on_hand,
            lot_total = report.lot_total,
            discrepancy = report.discrepancy,
            "On-hand quantity drifted from lot total"
        );
    }
    Ok(report)
}

/// Reconciles every product and returns only those that drifted
pub async fn reconcile_all<S>(store: &mut S) -> Result<Vec<ReconciliationReport>, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    let ids = store
        .product_ids()
        .await
        .map_err(|e| InventoryError::storage("list products", e))?;

    let mut drifted = Vec::new();
    for product_id in ids {
        let report = reconcile(&mut *store, product_id).await?;
        if !report.is_balanced {
            drifted.push(report);
        }
    }
    Ok(drifted)
}
