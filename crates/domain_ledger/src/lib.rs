//! Ledger Domain - Double-Entry Journal
//!
//! This crate implements the journal side of the POS accounting core: every
//! business event posts one balanced entry, and entries are never edited,
//! only offset by reversing entries.
//!
//! # Double-Entry Accounting Principles
//!
//! Every entry creates balanced debits and credits:
//! - Debits increase asset/expense accounts
//! - Credits increase liability/equity/revenue accounts
//! - The sum of all debits must equal the sum of all credits, to the cent
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{ledger, EntryDraft};
//!
//! let draft = EntryDraft::new("Sale #12")
//!     .debit("101", gross)
//!     .credit("401", net)
//!     .credit("601", vat);
//!
//! let entry = ledger::post(&mut work, draft).await?;
//! ```

pub mod account;
pub mod journal;
pub mod ports;
pub mod ledger;
pub mod error;

pub use account::{standard_chart, Account, AccountType};
pub use journal::{EntryDraft, JournalEntry, JournalLine};
pub use ports::{AccountFilter, AccountTotals, AggregateWindow, JournalStore, PostedLine};
pub use ledger::{AccountBalance, AccountLedger, LedgerRow};
pub use error::LedgerError;
