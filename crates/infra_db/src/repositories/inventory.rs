//! Inventory repository implementation
//!
//! Implements [`InventoryStore`] on [`PgUnitOfWork`]. Queries are checked at
//! runtime and decoded through `FromRow` row types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};
use tracing::instrument;

use core_kernel::{InventoryTransactionId, LotId, Money, PortError, ProductId};
use domain_inventory::{
    ConsumptionRef, InventoryLot, InventoryStore, InventoryTransaction, LotSource, NewInventoryTransaction,
    NewLot, ProductStock,
};

use crate::error::DatabaseError;
use crate::unit_of_work::PgUnitOfWork;

const LOT_COLUMNS: &str = "id, product_id, quantity_received, quantity_remaining, unit_cost, \
                           source_kind, source_id, is_opening_balance, created_at";

const TRANSACTION_COLUMNS: &str = "id, lot_id, product_id, quantity_used, unit_cost, total_cost, \
                                   sale_id, ar_invoice_id, adjustment_id, movement_id, created_at";

/// Database row for the products table
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub quantity_on_hand: i64,
    pub unit_cost: Decimal,
}

impl From<ProductRow> for ProductStock {
    fn from(row: ProductRow) -> Self {
        ProductStock {
            id: ProductId::new(row.id),
            name: row.name,
            quantity_on_hand: row.quantity_on_hand,
            unit_cost: Money::new(row.unit_cost),
        }
    }
}

/// Database row for the inventory_lots table
#[derive(Debug, Clone, FromRow)]
pub struct LotRow {
    pub id: i64,
    pub product_id: i64,
    pub quantity_received: i64,
    pub quantity_remaining: i64,
    pub unit_cost: Decimal,
    pub source_kind: String,
    pub source_id: Option<i64>,
    pub is_opening_balance: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for InventoryLot {
    type Error = DatabaseError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        let source = LotSource::from_parts(&row.source_kind, row.source_id).ok_or_else(|| {
            DatabaseError::CorruptRow(format!(
                "lot {} has unknown source {}:{:?}",
                row.id, row.source_kind, row.source_id
            ))
        })?;

        Ok(InventoryLot {
            id: LotId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity_received: row.quantity_received,
            quantity_remaining: row.quantity_remaining,
            unit_cost: Money::new(row.unit_cost),
            source,
            is_opening_balance: row.is_opening_balance,
            created_at: row.created_at,
        })
    }
}

/// Database row for the inventory_transactions table
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub lot_id: i64,
    pub product_id: i64,
    pub quantity_used: i64,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub sale_id: Option<i64>,
    pub ar_invoice_id: Option<i64>,
    pub adjustment_id: Option<i64>,
    pub movement_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for InventoryTransaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let reference = match (row.sale_id, row.ar_invoice_id, row.adjustment_id, row.movement_id) {
            (Some(id), None, None, None) => ConsumptionRef::Sale(id.into()),
            (None, Some(id), None, None) => ConsumptionRef::ArInvoice(id.into()),
            (None, None, Some(id), None) => ConsumptionRef::Adjustment(id.into()),
            (None, None, None, Some(id)) => ConsumptionRef::Movement(id.into()),
            _ => {
                return Err(DatabaseError::CorruptRow(format!(
                    "inventory transaction {} must reference exactly one document",
                    row.id
                )))
            }
        };

        Ok(InventoryTransaction {
            id: InventoryTransactionId::new(row.id),
            lot_id: LotId::new(row.lot_id),
            product_id: ProductId::new(row.product_id),
            quantity_used: row.quantity_used,
            unit_cost: Money::new(row.unit_cost),
            total_cost: Money::new(row.total_cost),
            reference,
            created_at: row.created_at,
        })
    }
}

/// Column of inventory_transactions that holds a reference kind
fn reference_column(reference: &ConsumptionRef) -> &'static str {
    match reference {
        ConsumptionRef::Sale(_) => "sale_id",
        ConsumptionRef::ArInvoice(_) => "ar_invoice_id",
        ConsumptionRef::Adjustment(_) => "adjustment_id",
        ConsumptionRef::Movement(_) => "movement_id",
    }
}

/// `(sale_id, ar_invoice_id, adjustment_id, movement_id)` for an insert
fn reference_values(reference: &ConsumptionRef) -> [Option<i64>; 4] {
    let mut values = [None; 4];
    let slot = match reference {
        ConsumptionRef::Sale(_) => 0,
        ConsumptionRef::ArInvoice(_) => 1,
        ConsumptionRef::Adjustment(_) => 2,
        ConsumptionRef::Movement(_) => 3,
    };
    values[slot] = Some(reference.document_id());
    values
}

type LotQuery<'q> = QueryAs<'q, Postgres, LotRow, PgArguments>;

impl PgUnitOfWork {
    async fn fetch_lots(&mut self, query: LotQuery<'_>) -> Result<Vec<InventoryLot>, PortError> {
        let fail = self.fail("load inventory lots");
        let rows = query.fetch_all(&mut *self.tx).await.map_err(fail)?;
        rows.into_iter()
            .map(InventoryLot::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(self.corrupt("decode inventory lot"))
    }
}

#[async_trait]
impl InventoryStore for PgUnitOfWork {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<ProductStock>, PortError> {
        let fail = self.fail("find product");
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, quantity_on_hand, unit_cost FROM products WHERE id = $1",
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(fail)?;
        Ok(row.map(ProductStock::from))
    }

    async fn product_ids(&mut self) -> Result<Vec<ProductId>, PortError> {
        let fail = self.fail("list products");
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(fail)?;
        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    async fn set_quantity_on_hand(&mut self, id: ProductId, quantity: i64) -> Result<(), PortError> {
        let fail = self.fail("set quantity on hand");
        let result = sqlx::query("UPDATE products SET quantity_on_hand = $2 WHERE id = $1")
            .bind(id.value())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("product", id));
        }
        Ok(())
    }

    async fn adjust_quantity_on_hand(&mut self, id: ProductId, delta: i64) -> Result<i64, PortError> {
        let fail = self.fail("adjust quantity on hand");
        let quantity: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET quantity_on_hand = quantity_on_hand + $2 WHERE id = $1 \
             RETURNING quantity_on_hand",
        )
        .bind(id.value())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(fail)?;
        quantity.ok_or_else(|| PortError::not_found("product", id))
    }

    #[instrument(skip(self, lot), fields(product_id = %lot.product_id, source = %lot.source))]
    async fn insert_lot(&mut self, lot: NewLot) -> Result<InventoryLot, PortError> {
        let fail = self.fail("insert inventory lot");
        let sql = format!(
            "INSERT INTO inventory_lots \
                (product_id, quantity_received, quantity_remaining, unit_cost, \
                 source_kind, source_id, is_opening_balance, created_at) \
             VALUES ($1, $2, $2, $3, $4, $5, $6, COALESCE($7, now())) \
             RETURNING {LOT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LotRow>(&sql)
            .bind(lot.product_id.value())
            .bind(lot.quantity)
            .bind(lot.unit_cost.amount())
            .bind(lot.source.kind())
            .bind(lot.source.document_id())
            .bind(lot.is_opening_balance)
            .bind(lot.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(fail)?;
        InventoryLot::try_from(row).map_err(self.corrupt("decode inventory lot"))
    }

    async fn lock_lot(&mut self, id: LotId) -> Result<Option<InventoryLot>, PortError> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM inventory_lots WHERE id = $1{}",
            self.lock.targeted_clause()
        );
        let query = sqlx::query_as(&sql).bind(id.value());
        Ok(self.fetch_lots(query).await?.pop())
    }

    async fn next_open_lot(&mut self, product_id: ProductId) -> Result<Option<InventoryLot>, PortError> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM inventory_lots \
             WHERE product_id = $1 AND quantity_remaining > 0 \
             ORDER BY created_at ASC, id ASC \
             LIMIT 1{}",
            self.lock.fifo_clause()
        );
        let query = sqlx::query_as(&sql).bind(product_id.value());
        Ok(self.fetch_lots(query).await?.pop())
    }

    async fn open_lots(&mut self, product_id: ProductId) -> Result<Vec<InventoryLot>, PortError> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM inventory_lots \
             WHERE product_id = $1 AND quantity_remaining > 0 \
             ORDER BY created_at ASC, id ASC"
        );
        let query = sqlx::query_as(&sql).bind(product_id.value());
        self.fetch_lots(query).await
    }

    async fn lots_from_source(&mut self, source: LotSource) -> Result<Vec<InventoryLot>, PortError> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM inventory_lots \
             WHERE source_kind = $1 AND source_id IS NOT DISTINCT FROM $2 \
             ORDER BY created_at ASC, id ASC{}",
            self.lock.targeted_clause()
        );
        let query = sqlx::query_as(&sql)
            .bind(source.kind())
            .bind(source.document_id());
        self.fetch_lots(query).await
    }

    async fn set_lot_remaining(&mut self, id: LotId, quantity_remaining: i64) -> Result<(), PortError> {
        let fail = self.fail("update lot remaining");
        let result = sqlx::query("UPDATE inventory_lots SET quantity_remaining = $2 WHERE id = $1")
            .bind(id.value())
            .bind(quantity_remaining)
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("inventory lot", id));
        }
        Ok(())
    }

    async fn delete_lot(&mut self, id: LotId) -> Result<(), PortError> {
        let fail = self.fail("delete inventory lot");
        let result = sqlx::query("DELETE FROM inventory_lots WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("inventory lot", id));
        }
        Ok(())
    }

    async fn lot_total(&mut self, product_id: ProductId) -> Result<i64, PortError> {
        let fail = self.fail("sum lot quantities");
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_remaining), 0)::BIGINT \
             FROM inventory_lots WHERE product_id = $1",
        )
        .bind(product_id.value())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(fail)
    }

    async fn insert_transaction(
        &mut self,
        transaction: NewInventoryTransaction,
    ) -> Result<InventoryTransaction, PortError> {
        let fail = self.fail("insert inventory transaction");
        let [sale_id, ar_invoice_id, adjustment_id, movement_id] = reference_values(&transaction.reference);
        let sql = format!(
            "INSERT INTO inventory_transactions \
                (lot_id, product_id, quantity_used, unit_cost, total_cost, \
                 sale_id, ar_invoice_id, adjustment_id, movement_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(transaction.lot_id.value())
            .bind(transaction.product_id.value())
            .bind(transaction.quantity_used)
            .bind(transaction.unit_cost.amount())
            .bind(transaction.total_cost.amount())
            .bind(sale_id)
            .bind(ar_invoice_id)
            .bind(adjustment_id)
            .bind(movement_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(fail)?;
        InventoryTransaction::try_from(row).map_err(self.corrupt("decode inventory transaction"))
    }

    async fn transactions_for(
        &mut self,
        reference: ConsumptionRef,
    ) -> Result<Vec<InventoryTransaction>, PortError> {
        let fail = self.fail("load inventory transactions");
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions WHERE {} = $1 ORDER BY id ASC",
            reference_column(&reference)
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(reference.document_id())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(fail)?;
        rows.into_iter()
            .map(InventoryTransaction::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(self.corrupt("decode inventory transaction"))
    }

    async fn delete_transaction(&mut self, id: InventoryTransactionId) -> Result<(), PortError> {
        let fail = self.fail("delete inventory transaction");
        sqlx::query("DELETE FROM inventory_transactions WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        Ok(())
    }
}
