//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants, plus `fake` helpers for names.

use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating positive lot quantities
pub fn lot_quantity_strategy() -> impl Strategy<Value = i64> {
    1i64..500i64
}

/// Strategy for generating unit costs with two decimal places
pub fn unit_cost_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating a product's lots as `(quantity, unit_cost)`
pub fn lots_strategy(max_lots: usize) -> impl Strategy<Value = Vec<(i64, Decimal)>> {
    prop::collection::vec((lot_quantity_strategy(), unit_cost_strategy()), 1..=max_lots)
}

/// Strategy for generating a list of consumption requests
pub fn consumption_plan_strategy(max_steps: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..200i64, 1..=max_steps)
}

/// Strategy for generating VAT rates as percentages (0% to 25%)
pub fn vat_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=2500u32).prop_map(|n| Decimal::new(i64::from(n), 2))
}

/// A random product name
pub fn product_name() -> String {
    let brand: String = CompanyName().fake();
    let item: String = Word().fake();
    format!("{brand} {item}")
}
