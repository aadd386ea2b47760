//! Inventory lots and the receive operation

use chrono::{DateTime, Utc};
use core_kernel::{AdjustmentId, LotId, Money, MoneyError, MovementId, ProductId, PurchaseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

use crate::error::InventoryError;
use crate::ports::InventoryStore;

/// The business event that brought a lot into stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LotSource {
    Purchase(PurchaseId),
    Adjustment(AdjustmentId),
    Movement(MovementId),
    OpeningBalance,
}

impl LotSource {
    /// Stable name used for persistence
    pub fn kind(&self) -> &'static str {
        match self {
            LotSource::Purchase(_) => "purchase",
            LotSource::Adjustment(_) => "adjustment",
            LotSource::Movement(_) => "movement",
            LotSource::OpeningBalance => "opening_balance",
        }
    }

    /// Id of the source document, if any
    pub fn document_id(&self) -> Option<i64> {
        match self {
            LotSource::Purchase(id) => Some(id.value()),
            LotSource::Adjustment(id) => Some(id.value()),
            LotSource::Movement(id) => Some(id.value()),
            LotSource::OpeningBalance => None,
        }
    }

    /// Rebuilds a source from its persisted parts
    pub fn from_parts(kind: &str, document_id: Option<i64>) -> Option<Self> {
        match (kind, document_id) {
            ("purchase", Some(id)) => Some(LotSource::Purchase(id.into())),
            ("adjustment", Some(id)) => Some(LotSource::Adjustment(id.into())),
            ("movement", Some(id)) => Some(LotSource::Movement(id.into())),
            ("opening_balance", _) => Some(LotSource::OpeningBalance),
            _ => None,
        }
    }
}

impl fmt::Display for LotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document_id() {
            Some(id) => write!(f, "{}:{}", self.kind(), id),
            None => f.write_str(self.kind()),
        }
    }
}

/// A quantity of one product received at one unit cost
///
/// Only `quantity_remaining` ever changes after creation. Drained lots are
/// kept as audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    pub id: LotId,
    pub product_id: ProductId,
    pub quantity_received: i64,
    pub quantity_remaining: i64,
    pub unit_cost: Money,
    pub source: LotSource,
    pub is_opening_balance: bool,
    pub created_at: DateTime<Utc>,
}

impl InventoryLot {
    /// Cost value of the stock still in this lot
    pub fn remaining_value(&self) -> Result<Money, MoneyError> {
        self.unit_cost.checked_times(self.quantity_remaining)
    }

    pub fn is_open(&self) -> bool {
        self.quantity_remaining > 0
    }

    pub fn is_untouched(&self) -> bool {
        self.quantity_remaining == self.quantity_received
    }

    /// FIFO sort key: oldest first, ties broken by id
    pub fn fifo_key(&self) -> (DateTime<Utc>, LotId) {
        (self.created_at, self.id)
    }
}

/// A validated lot ready to be inserted by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLot {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
    pub source: LotSource,
    pub is_opening_balance: bool,
    /// `None` lets the store stamp its own clock
    pub created_at: Option<DateTime<Utc>>,
}

/// Input to [`receive`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub source: LotSource,
    #[serde(default)]
    pub is_opening_balance: bool,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl ReceiveRequest {
    pub fn new(product_id: ProductId, quantity: i64, unit_cost: Decimal, source: LotSource) -> Self {
        Self {
            product_id,
            quantity,
            unit_cost,
            is_opening_balance: matches!(source, LotSource::OpeningBalance),
            source,
            received_at: None,
        }
    }

    /// Marks the lot as an opening balance
    pub fn opening_balance(mut self) -> Self {
        self.is_opening_balance = true;
        self
    }

    /// Backdates the lot, placing it earlier in FIFO order
    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }

    fn validate(&self) -> Result<(), InventoryError> {
        if self.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(format!(
                "received quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(InventoryError::InvalidCost(format!(
                "unit cost cannot be negative, got {}",
                self.unit_cost
            )));
        }
        Ok(())
    }
}

/// Records a new lot of stock
///
/// The product must exist. The cached on-hand quantity is left alone; the
/// calling workflow adjusts it inside the same unit of work.
#[instrument(skip(store, request), fields(product_id = %request.product_id, quantity = request.quantity, source = %request.source))]
pub async fn receive<S>(store: &mut S, request: ReceiveRequest) -> Result<InventoryLot, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    request.validate()?;

    let operation = format!("receive {} x {}", request.product_id, request.quantity);
    let product = store
        .find_product(request.product_id)
        .await
        .map_err(|e| InventoryError::storage(&operation, e))?;
    if product.is_none() {
        return Err(InventoryError::NotFound(format!("product {}", request.product_id)));
    }

    let lot = store
        .insert_lot(NewLot {
            product_id: request.product_id,
            quantity: request.quantity,
            unit_cost: Money::new(request.unit_cost),
            source: request.source,
            is_opening_balance: request.is_opening_balance,
            created_at: request.received_at,
        })
        .await
        .map_err(|e| InventoryError::storage(&operation, e))?;

    info!(lot_id = %lot.id, unit_cost = %lot.unit_cost, "Inventory lot received");
    Ok(lot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_source_round_trips_through_parts() {
        let source = LotSource::Purchase(PurchaseId::new(4));
        assert_eq!(LotSource::from_parts(source.kind(), source.document_id()), Some(source));
        assert_eq!(LotSource::from_parts("opening_balance", None), Some(LotSource::OpeningBalance));
        assert_eq!(LotSource::from_parts("purchase", None), None);
    }

    #[test]
    fn test_opening_balance_source_sets_flag() {
        let request = ReceiveRequest::new(ProductId::new(1), 5, dec!(2), LotSource::OpeningBalance);
        assert!(request.is_opening_balance);
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let source = LotSource::Purchase(PurchaseId::new(1));
        let zero = ReceiveRequest::new(ProductId::new(1), 0, dec!(1), source);
        assert!(matches!(zero.validate(), Err(InventoryError::InvalidQuantity(_))));

        let negative_cost = ReceiveRequest::new(ProductId::new(1), 1, dec!(-0.01), source);
        assert!(matches!(negative_cost.validate(), Err(InventoryError::InvalidCost(_))));

        let free = ReceiveRequest::new(ProductId::new(1), 1, dec!(0), source);
        assert!(free.validate().is_ok());
    }
}
