//! Test Data Builders
//!
//! Provides builders that seed the in-memory stores with sensible defaults.
//! Tests specify only the lots and products that matter to them.

use chrono::{DateTime, Utc};
use core_kernel::{Money, ProductId, PurchaseId, TransactionScope};
use domain_inventory::ports::mock::InMemoryInventory;
use domain_inventory::{receive, InventoryStore, LotSource, ProductStock, ReceiveRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{IdFixtures, TemporalFixtures};

/// Builder for a product record
#[derive(Debug, Clone)]
pub struct ProductBuilder {
    id: ProductId,
    name: String,
    unit_cost: Money,
}

impl Default for ProductBuilder {
    fn default() -> Self {
        Self::new(IdFixtures::product())
    }
}

impl ProductBuilder {
    /// Creates a builder with default values
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            name: format!("Product {}", id.value()),
            unit_cost: Money::new(dec!(4.00)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the fallback unit cost used for positive adjustments
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Money::new(unit_cost);
        self
    }

    /// Builds the product with nothing on hand
    pub fn build(self) -> ProductStock {
        ProductStock {
            id: self.id,
            name: self.name,
            quantity_on_hand: 0,
            unit_cost: self.unit_cost,
        }
    }
}

struct PlannedLot {
    product_id: ProductId,
    quantity: i64,
    unit_cost: Decimal,
    source: LotSource,
    received_at: DateTime<Utc>,
}

/// Builder for an in-memory inventory with products and lots
///
/// Lots are received one minute apart in the order they are added and
/// on-hand quantities are kept in step, so the built store reconciles.
///
/// # Example
///
/// ```rust,ignore
/// let store = StockBuilder::new()
///     .product(ProductBuilder::default())
///     .lot(IdFixtures::product(), 10, dec!(5.00))
///     .lot(IdFixtures::product(), 10, dec!(7.00))
///     .build()
///     .await;
/// ```
#[derive(Default)]
pub struct StockBuilder {
    products: Vec<ProductStock>,
    lots: Vec<PlannedLot>,
}

impl StockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a product
    pub fn product(mut self, product: ProductBuilder) -> Self {
        self.products.push(product.build());
        self
    }

    /// Plans a purchased lot
    pub fn lot(self, product_id: ProductId, quantity: i64, unit_cost: Decimal) -> Self {
        self.lot_from(product_id, quantity, unit_cost, LotSource::Purchase(IdFixtures::purchase()))
    }

    /// Plans a lot with an explicit source
    pub fn lot_from(mut self, product_id: ProductId, quantity: i64, unit_cost: Decimal, source: LotSource) -> Self {
        let minutes = i64::try_from(self.lots.len()).unwrap_or(i64::MAX);
        self.lots.push(PlannedLot {
            product_id,
            quantity,
            unit_cost,
            source,
            received_at: TemporalFixtures::received(minutes),
        });
        self
    }

    /// Creates the store and commits every planned lot
    ///
    /// # Panics
    ///
    /// Panics if a lot is invalid or references an unknown product
    pub async fn build(self) -> InMemoryInventory {
        let store = InMemoryInventory::with_products(self.products).await;
        let mut work = store.begin_work().await.expect("begin seeding");

        for lot in self.lots {
            let request = ReceiveRequest::new(lot.product_id, lot.quantity, lot.unit_cost, lot.source)
                .received_at(lot.received_at);
            receive(&mut work, request).await.expect("seed lot");
            work.adjust_quantity_on_hand(lot.product_id, lot.quantity)
                .await
                .expect("seed on-hand");
        }

        work.commit().await.expect("commit seeding");
        store
    }
}

/// Standard FIFO scenario: lot A 10 @ 5.00 then lot B 10 @ 7.00
pub async fn two_lot_stock() -> InMemoryInventory {
    let product = IdFixtures::product();
    StockBuilder::new()
        .product(ProductBuilder::new(product))
        .lot(product, 10, dec!(5.00))
        .lot(product, 10, dec!(7.00))
        .build()
        .await
}

/// A purchase source with the given id
pub fn purchase(id: i64) -> LotSource {
    LotSource::Purchase(PurchaseId::new(id))
}
