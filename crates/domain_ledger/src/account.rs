//! Account types for the chart of accounts
//!
//! The ledger stores account codes only. The chart lives with the caller;
//! [`standard_chart`] is the default POS chart the workflows map onto.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::Money;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Interprets a `debit - credit` net under this type's sign convention
    ///
    /// A positive result means the account carries its normal balance.
    pub fn normal_balance(&self, net: Money) -> Money {
        if self.is_debit_normal() {
            net
        } else {
            -net
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        };
        f.write_str(name)
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" | "income" => Ok(AccountType::Revenue),
            "expense" => Ok(AccountType::Expense),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account code (e.g., "101")
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
}

impl Account {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
        }
    }
}

/// The default POS chart of accounts
pub fn standard_chart() -> Vec<Account> {
    use AccountType::*;

    [
        ("101", "Cash", Asset),
        ("110", "Accounts Receivable", Asset),
        ("120", "Inventory", Asset),
        ("201", "Accounts Payable", Liability),
        ("301", "Capital", Equity),
        ("302", "Opening Balance Equity", Equity),
        ("401", "Sales Revenue", Revenue),
        ("405", "Sales Returns", Revenue),
        ("406", "Inventory Gain", Revenue),
        ("407", "Discounts Allowed", Expense),
        ("501", "COGS", Expense),
        ("505", "Inventory Loss", Expense),
        ("601", "VAT Payable", Liability),
        ("602", "VAT Input", Asset),
    ]
    .into_iter()
    .map(|(code, name, account_type)| Account::new(code, name, account_type))
    .collect()
}
