//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common values across the POS core.
//! These fixtures are designed to be consistent and predictable for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Money, ProductId, PurchaseId, SaleId, UserId};
use domain_ledger::{standard_chart, Account};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

/// The default POS chart of accounts
pub static CHART: Lazy<Vec<Account>> = Lazy::new(standard_chart);

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Unit cost of the older lot in the standard FIFO scenario
    pub fn cost_5() -> Money {
        Money::new(dec!(5.00))
    }

    /// Unit cost of the newer lot in the standard FIFO scenario
    pub fn cost_7() -> Money {
        Money::new(dec!(7.00))
    }

    /// VAT-inclusive gross of the standard sale
    pub fn gross_112() -> Money {
        Money::new(dec!(112.00))
    }

    /// Net revenue of the standard sale
    pub fn net_100() -> Money {
        Money::new(dec!(100.00))
    }

    /// VAT of the standard sale
    pub fn vat_12() -> Money {
        Money::new(dec!(12.00))
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Start of the test calendar (Jan 1, 2024)
    pub fn day_one() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// A receipt time `minutes` after the start of the test calendar
    pub fn received(minutes: i64) -> DateTime<Utc> {
        Self::day_one() + Duration::minutes(minutes)
    }

}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn product() -> ProductId {
        ProductId::new(1)
    }

    pub fn other_product() -> ProductId {
        ProductId::new(2)
    }

    pub fn sale() -> SaleId {
        SaleId::new(1)
    }

    pub fn purchase() -> PurchaseId {
        PurchaseId::new(1)
    }

    pub fn cashier() -> UserId {
        UserId::new(7)
    }
}

/// Fixture for account codes of the standard chart
pub struct AccountFixtures;

impl AccountFixtures {
    pub fn cash() -> &'static str {
        "101"
    }

    pub fn inventory() -> &'static str {
        "120"
    }

    pub fn sales_revenue() -> &'static str {
        "401"
    }

    pub fn cogs() -> &'static str {
        "501"
    }

    pub fn vat_payable() -> &'static str {
        "601"
    }
}
