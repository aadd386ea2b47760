//! Consumption transactions
//!
//! One row per lot slice drained by the FIFO engine. Reversal finds the rows
//! of a document through its [`ConsumptionRef`] and deletes them.

use chrono::{DateTime, Utc};
use core_kernel::{
    AdjustmentId, ArInvoiceId, InventoryTransactionId, LotId, Money, MovementId, ProductId, SaleId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The business document a consumption belongs to
///
/// Exactly one document owns every consumption row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ConsumptionRef {
    Sale(SaleId),
    ArInvoice(ArInvoiceId),
    Adjustment(AdjustmentId),
    Movement(MovementId),
}

impl ConsumptionRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ConsumptionRef::Sale(_) => "sale",
            ConsumptionRef::ArInvoice(_) => "ar_invoice",
            ConsumptionRef::Adjustment(_) => "adjustment",
            ConsumptionRef::Movement(_) => "movement",
        }
    }

    pub fn document_id(&self) -> i64 {
        match self {
            ConsumptionRef::Sale(id) => id.value(),
            ConsumptionRef::ArInvoice(id) => id.value(),
            ConsumptionRef::Adjustment(id) => id.value(),
            ConsumptionRef::Movement(id) => id.value(),
        }
    }
}

impl fmt::Display for ConsumptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.document_id())
    }
}

/// A recorded draw of `quantity_used` units from one lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: InventoryTransactionId,
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub quantity_used: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
    pub reference: ConsumptionRef,
    pub created_at: DateTime<Utc>,
}

/// A consumption row before the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventoryTransaction {
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub quantity_used: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
    pub reference: ConsumptionRef,
}
