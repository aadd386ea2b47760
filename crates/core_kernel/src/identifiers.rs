//! Strongly-typed identifiers for domain entities
//!
//! Rows are keyed by database sequences, so every identifier wraps an `i64`.
//! The newtypes keep a lot id from being passed where a product id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw sequence value
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying sequence value
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(raw.trim().parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

// Inventory identifiers
define_id!(ProductId, "PRD");
define_id!(LotId, "LOT");
define_id!(InventoryTransactionId, "ITX");

// Ledger identifiers
define_id!(JournalEntryId, "JE");

// Business documents that move stock or post entries
define_id!(SaleId, "SALE");
define_id!(ArInvoiceId, "ARI");
define_id!(PurchaseId, "PUR");
define_id!(AdjustmentId, "ADJ");
define_id!(MovementId, "MOV");

// Actors
define_id!(UserId, "USR");
