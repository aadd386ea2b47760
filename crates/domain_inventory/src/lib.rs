//! Inventory Domain - FIFO Cost Lots
//!
//! Stock is held as a set of cost lots per product. Every receipt creates a
//! lot carrying the unit cost at which it arrived; every outflow drains the
//! oldest lots first and records one consumption transaction per lot slice,
//! so cost of goods always reflects the actual purchase history.
//!
//! # Flow
//!
//! - [`lot::receive`] creates lots (purchases, positive adjustments, inbound
//!   transfers, opening balances)
//! - [`FifoEngine::consume`] drains lots oldest-first for sales, AR invoices,
//!   negative adjustments and outbound transfers
//! - [`reversal::reverse_consumption`] undoes a consumption when its source
//!   document is voided
//! - [`reconciliation::reconcile`] compares the cached on-hand quantity with
//!   the lot totals
//!
//! All operations work against an [`InventoryStore`], one open unit of work.
//! The caller commits or drops it.

pub mod error;
pub mod lot;
pub mod transaction;
pub mod ports;
pub mod fifo;
pub mod reversal;
pub mod reconciliation;
pub mod valuation;

pub use error::InventoryError;
pub use lot::{receive, InventoryLot, LotSource, NewLot, ReceiveRequest};
pub use transaction::{ConsumptionRef, InventoryTransaction, NewInventoryTransaction};
pub use ports::{InventoryStore, ProductStock};
pub use fifo::{Consumption, CostPreview, FifoEngine, FifoPolicy, DEFAULT_MAX_LOTS_PER_CALL};
pub use reversal::{reverse_consumption, RestoredUnits};
pub use reconciliation::{reconcile, reconcile_all, ReconciliationReport};
pub use valuation::{lot_summary, weighted_average_cost, LotSummary};
