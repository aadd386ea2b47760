//! Inventory valuation helpers for reporting

use chrono::{DateTime, Utc};
use core_kernel::{safe_divide, LotId, Money, MoneyError, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::InventoryError;
use crate::lot::{InventoryLot, LotSource};
use crate::ports::InventoryStore;

/// One open lot as shown in stock reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotSummary {
    pub lot_id: LotId,
    pub quantity_remaining: i64,
    pub unit_cost: Money,
    pub total_value: Money,
    pub source: LotSource,
    pub is_opening_balance: bool,
    pub created_at: DateTime<Utc>,
    pub age_days: i64,
}

impl LotSummary {
    fn from_lot(lot: &InventoryLot, as_of: DateTime<Utc>) -> Result<Self, InventoryError> {
        Ok(Self {
            lot_id: lot.id,
            quantity_remaining: lot.quantity_remaining,
            unit_cost: lot.unit_cost,
            total_value: lot
                .remaining_value()
                .map_err(InventoryError::cost_overflow(lot.product_id))?,
            source: lot.source,
            is_opening_balance: lot.is_opening_balance,
            created_at: lot.created_at,
            age_days: (as_of - lot.created_at).num_days().max(0),
        })
    }
}

/// Weighted average unit cost over the open lots, `0.00` without stock
pub async fn weighted_average_cost<S>(store: &mut S, product_id: ProductId) -> Result<Money, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    let lots = store
        .open_lots(product_id)
        .await
        .map_err(|e| InventoryError::storage(format!("value {product_id}"), e))?;

    let overflow = InventoryError::cost_overflow(product_id);
    let mut units = Decimal::ZERO;
    let mut value = Decimal::ZERO;
    for lot in &lots {
        let lot_value = lot.remaining_value().map_err(&overflow)?;
        units += Decimal::from(lot.quantity_remaining);
        value = value
            .checked_add(lot_value.amount())
            .ok_or(MoneyError::Overflow)
            .map_err(&overflow)?;
    }

    Ok(Money::new(safe_divide(value, units, Decimal::ZERO)))
}

/// Open lots of a product in FIFO order with value and age
pub async fn lot_summary<S>(
    store: &mut S,
    product_id: ProductId,
    as_of: DateTime<Utc>,
) -> Result<Vec<LotSummary>, InventoryError>
where
    S: InventoryStore + ?Sized,
{
    let lots = store
        .open_lots(product_id)
        .await
        .map_err(|e| InventoryError::storage(format!("summarize lots of {product_id}"), e))?;

    lots.iter().map(|lot| LotSummary::from_lot(lot, as_of)).collect()
}
