//! Business documents accepted by the workflows

use core_kernel::{AdjustmentId, Money, MovementId, ProductId, PurchaseId, UserId};
use domain_inventory::{Consumption, InventoryLot, RestoredUnits};
use domain_ledger::JournalEntry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::SaleTotals;

/// One priced line of a sale or AR invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// VAT-inclusive selling price per unit
    pub unit_price: Decimal,
}

/// A discount granted on a whole document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the gross, 0 to 100
    Percent(Decimal),
    /// Fixed amount, capped at the gross
    Fixed(Decimal),
    /// Statutory discount for VAT-exempt buyers: VAT is removed first and
    /// the percentage applies to the net
    VatExempt(Decimal),
}

/// Lines and pricing terms of a sale or AR invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub lines: Vec<SaleLine>,
    pub discount: Option<Discount>,
    pub vatable: bool,
    /// Customer or note appended to the journal description
    pub memo: Option<String>,
}

impl Default for SaleRequest {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            discount: None,
            vatable: true,
            memo: None,
        }
    }
}

impl SaleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, product_id: ProductId, quantity: i64, unit_price: Decimal) -> Self {
        self.lines.push(SaleLine {
            product_id,
            quantity,
            unit_price,
        });
        self
    }

    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Marks the document as not subject to VAT
    pub fn non_vatable(mut self) -> Self {
        self.vatable = false;
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// A posted sale or AR invoice
#[derive(Debug, Clone, Serialize)]
pub struct PostedSale {
    pub totals: SaleTotals,
    pub cost_of_goods: Money,
    pub consumptions: Vec<Consumption>,
    pub entry: JournalEntry,
}

/// How a purchase is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    Cash,
    #[default]
    Credit,
}

impl std::fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentTerms::Cash => f.write_str("Cash"),
            PaymentTerms::Credit => f.write_str("Credit"),
        }
    }
}

/// One line of a supplier delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit cost before VAT
    pub unit_cost: Decimal,
}

/// A supplier delivery received into stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub purchase_id: PurchaseId,
    pub supplier: String,
    pub payment: PaymentTerms,
    pub vatable: bool,
    pub lines: Vec<PurchaseLine>,
}

impl PurchaseRequest {
    pub fn new(purchase_id: PurchaseId, supplier: impl Into<String>) -> Self {
        Self {
            purchase_id,
            supplier: supplier.into(),
            payment: PaymentTerms::default(),
            vatable: true,
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, product_id: ProductId, quantity: i64, unit_cost: Decimal) -> Self {
        self.lines.push(PurchaseLine {
            product_id,
            quantity,
            unit_cost,
        });
        self
    }

    pub fn paid_in_cash(mut self) -> Self {
        self.payment = PaymentTerms::Cash;
        self
    }

    pub fn non_vatable(mut self) -> Self {
        self.vatable = false;
        self
    }
}

/// A received purchase
///
/// `entry` is `None` for a delivery of free goods.
#[derive(Debug, Clone, Serialize)]
pub struct PostedPurchase {
    pub net: Money,
    pub vat: Money,
    pub total: Money,
    pub lots: Vec<InventoryLot>,
    pub entry: Option<JournalEntry>,
}

/// A manual stock correction; positive adds stock, negative removes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub adjustment_id: AdjustmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub reason: String,
}

/// A posted stock adjustment
///
/// `entry` is `None` when the adjusted stock carried no cost.
#[derive(Debug, Clone, Serialize)]
pub struct PostedAdjustment {
    pub value: Money,
    pub lot: Option<InventoryLot>,
    pub consumption: Option<Consumption>,
    pub entry: Option<JournalEntry>,
}

/// Stock leaving for another branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOut {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub destination: String,
}

/// Stock arriving from another branch at the cost it left with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIn {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub origin: String,
}

/// Who voids a document and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidRequest {
    pub reason: String,
    pub voided_by: Option<UserId>,
}

impl VoidRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            voided_by: None,
        }
    }

    pub fn by(mut self, user: UserId) -> Self {
        self.voided_by = Some(user);
        self
    }
}

/// What a void undid
#[derive(Debug, Clone, Default, Serialize)]
pub struct VoidOutcome {
    /// The reversing journal entry, when the document had one
    pub reversal: Option<JournalEntry>,
    /// Units put back into their lots
    pub restored: RestoredUnits,
    /// Lots withdrawn because the document had received them
    pub lots_removed: Vec<InventoryLot>,
}

impl VoidOutcome {
    /// True when the document left nothing to undo
    pub fn is_noop(&self) -> bool {
        self.reversal.is_none() && self.restored.is_empty() && self.lots_removed.is_empty()
    }
}

/// One opening balance row as it arrives from a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalanceRow {
    pub product_id: ProductId,
    pub quantity: String,
    pub unit_cost: String,
}

impl OpeningBalanceRow {
    pub fn new(product_id: ProductId, quantity: impl Into<String>, unit_cost: impl Into<String>) -> Self {
        Self {
            product_id,
            quantity: quantity.into(),
            unit_cost: unit_cost.into(),
        }
    }
}
