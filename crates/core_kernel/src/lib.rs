//! Core Kernel - Foundational types shared by the POS accounting core
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Amount normalization and a two-decimal `Money` type
//! - Whole-unit quantity parsing
//! - Strongly-typed identifiers
//! - Port error and unit-of-work traits

pub mod money;
pub mod quantity;
pub mod identifiers;
pub mod ports;

pub use money::{
    normalize, parse_amount, parse_display, quantize, safe_divide, Money, MoneyError, Rate,
    RawAmount,
};
pub use quantity::parse_units;
pub use identifiers::{
    AdjustmentId, ArInvoiceId, InventoryTransactionId, JournalEntryId, LotId, MovementId,
    ProductId, PurchaseId, SaleId, UserId,
};
pub use ports::{DomainPort, PortError, TransactionScope, UnitOfWorkFactory};
