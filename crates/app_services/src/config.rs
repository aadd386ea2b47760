//! Workflow configuration

use core_kernel::Rate;
use domain_inventory::FifoPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::accounts::AccountMap;

/// Default rows per opening balance batch
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 500;

/// Settings shared by every workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// VAT rate as a percentage, e.g. `12` for 12%
    pub vat_percentage: Decimal,
    /// Rows committed per opening balance batch
    pub import_batch_size: usize,
    pub fifo: FifoPolicy,
    pub accounts: AccountMap,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            vat_percentage: dec!(12),
            import_batch_size: DEFAULT_IMPORT_BATCH_SIZE,
            fifo: FifoPolicy::default(),
            accounts: AccountMap::default(),
        }
    }
}

impl ServiceConfig {
    pub fn vat_rate(&self) -> Rate {
        Rate::from_percentage(self.vat_percentage)
    }

    /// Sets the VAT percentage
    pub fn with_vat_percentage(mut self, percentage: Decimal) -> Self {
        self.vat_percentage = percentage;
        self
    }

    /// Sets the opening balance batch size; zero is treated as one
    pub fn with_import_batch_size(mut self, rows: usize) -> Self {
        self.import_batch_size = rows.max(1);
        self
    }

    /// Checks the settings a workflow relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.vat_percentage < Decimal::ZERO || self.vat_percentage >= dec!(100) {
            return Err(format!("VAT percentage out of range: {}", self.vat_percentage));
        }
        if self.fifo.max_lots_per_call == 0 {
            return Err("fifo.max_lots_per_call must be positive".to_string());
        }
        let blank = self.accounts.blank_roles();
        if !blank.is_empty() {
            return Err(format!("accounts without a code: {}", blank.join(", ")));
        }
        Ok(())
    }
}
