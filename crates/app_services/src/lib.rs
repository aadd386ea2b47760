//! Application Services - POS business workflows
//!
//! The call sites of the inventory and ledger domains. Each workflow turns
//! one business document into lot movements plus one balanced journal
//! entry, committed together through a single unit of work:
//!
//! - Sales and AR invoices drain stock FIFO and post revenue, VAT and COGS
//! - Purchases receive lots and post inventory against cash or payables
//! - Adjustments add or drain stock and post gains or losses
//! - Transfers move stock between branches without posting
//! - Voids undo any of the above through reversing entries
//! - Opening balances are imported in independently committed batches
//!
//! # Example
//!
//! ```rust,ignore
//! let service = PosService::new(factory, ServiceConfig::default());
//! let sale = service
//!     .record_sale(SaleId::new(7), SaleRequest::new().line(product, 3, dec!(37.33)))
//!     .await?;
//! service.void_sale(SaleId::new(7), VoidRequest::new("Customer returned goods")).await?;
//! ```

pub mod accounts;
pub mod config;
pub mod documents;
pub mod error;
pub mod pricing;
pub mod service;
pub mod unit_of_work;

mod adjustments;
mod import;
mod purchasing;
mod sales;
mod transfers;
mod voids;

pub use accounts::AccountMap;
pub use config::ServiceConfig;
pub use documents::{
    AdjustmentRequest, Discount, OpeningBalanceRow, PaymentTerms, PostedAdjustment, PostedPurchase, PostedSale,
    PurchaseLine, PurchaseRequest, SaleLine, SaleRequest, TransferIn, TransferOut, VoidOutcome, VoidRequest,
};
pub use error::WorkflowError;
pub use import::{BatchFailure, ImportReport};
pub use pricing::{price_sale, SaleTotals};
pub use service::PosService;
pub use unit_of_work::Books;
