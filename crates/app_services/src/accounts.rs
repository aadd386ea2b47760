//! System account mapping
//!
//! Workflows never hard-code account codes; they ask the [`AccountMap`] for
//! the code playing a role. The defaults follow the standard POS chart.

use domain_ledger::{standard_chart, Account};
use serde::{Deserialize, Serialize};

/// Account codes used by the posting workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountMap {
    pub cash: String,
    pub accounts_receivable: String,
    pub inventory: String,
    pub accounts_payable: String,
    pub opening_balance_equity: String,
    pub sales_revenue: String,
    pub inventory_gain: String,
    pub discounts_allowed: String,
    pub cost_of_goods_sold: String,
    pub inventory_loss: String,
    pub vat_payable: String,
    pub vat_input: String,
}

impl Default for AccountMap {
    fn default() -> Self {
        Self {
            cash: "101".to_string(),
            accounts_receivable: "110".to_string(),
            inventory: "120".to_string(),
            accounts_payable: "201".to_string(),
            opening_balance_equity: "302".to_string(),
            sales_revenue: "401".to_string(),
            inventory_gain: "406".to_string(),
            discounts_allowed: "407".to_string(),
            cost_of_goods_sold: "501".to_string(),
            inventory_loss: "505".to_string(),
            vat_payable: "601".to_string(),
            vat_input: "602".to_string(),
        }
    }
}

impl AccountMap {
    fn codes(&self) -> [(&'static str, &str); 12] {
        [
            ("cash", self.cash.as_str()),
            ("accounts_receivable", self.accounts_receivable.as_str()),
            ("inventory", self.inventory.as_str()),
            ("accounts_payable", self.accounts_payable.as_str()),
            ("opening_balance_equity", self.opening_balance_equity.as_str()),
            ("sales_revenue", self.sales_revenue.as_str()),
            ("inventory_gain", self.inventory_gain.as_str()),
            ("discounts_allowed", self.discounts_allowed.as_str()),
            ("cost_of_goods_sold", self.cost_of_goods_sold.as_str()),
            ("inventory_loss", self.inventory_loss.as_str()),
            ("vat_payable", self.vat_payable.as_str()),
            ("vat_input", self.vat_input.as_str()),
        ]
    }

    /// Names of roles mapped to a code missing from `chart`
    pub fn unknown_roles(&self, chart: &[Account]) -> Vec<&'static str> {
        self.codes()
            .into_iter()
            .filter(|(_, code)| !chart.iter().any(|a| a.code == *code))
            .map(|(role, _)| role)
            .collect()
    }

    /// Names of roles left without a code
    pub fn blank_roles(&self) -> Vec<&'static str> {
        self.codes()
            .into_iter()
            .filter(|(_, code)| code.trim().is_empty())
            .map(|(role, _)| role)
            .collect()
    }

    /// True when every role maps to an account of the standard chart
    pub fn matches_standard_chart(&self) -> bool {
        self.unknown_roles(&standard_chart()).is_empty()
    }
}
