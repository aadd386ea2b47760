//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use core_kernel::ProductId;
use domain_inventory::ports::mock::InventoryState;
use domain_inventory::InventoryLot;
use domain_ledger::JournalEntry;

/// Asserts that an entry's debits equal its credits
pub fn assert_entry_balanced(entry: &JournalEntry) {
    assert_eq!(
        entry.total_debits(),
        entry.total_credits(),
        "Entry {} is unbalanced: debits={}, credits={}",
        entry.id,
        entry.total_debits(),
        entry.total_credits()
    );
}

/// Asserts that a product's cached on-hand equals the sum of its lots
pub fn assert_on_hand_matches_lots(state: &InventoryState, product_id: ProductId) {
    let on_hand = state
        .products
        .get(&product_id)
        .map(|p| p.quantity_on_hand)
        .unwrap_or_else(|| panic!("Unknown product {product_id}"));
    let lot_total: i64 = state
        .lots
        .values()
        .filter(|l| l.product_id == product_id)
        .map(|l| l.quantity_remaining)
        .sum();

    assert_eq!(
        on_hand, lot_total,
        "Product {product_id} drifted: on_hand={on_hand}, lot_total={lot_total}"
    );
}

/// Asserts that every lot keeps `0 <= remaining <= received`
pub fn assert_lot_bounds(state: &InventoryState) {
    for lot in state.lots.values() {
        assert!(
            (0..=lot.quantity_received).contains(&lot.quantity_remaining),
            "Lot {} out of bounds: remaining={}, received={}",
            lot.id,
            lot.quantity_remaining,
            lot.quantity_received
        );
    }
}

/// Asserts that only the oldest open lot can be partially consumed
///
/// Lots are visited in FIFO order; once an untouched lot is seen, no later
/// lot may have been drawn from.
pub fn assert_fifo_drain_order(lots: &[InventoryLot]) {
    let mut ordered: Vec<&InventoryLot> = lots.iter().collect();
    ordered.sort_by_key(|l| l.fifo_key());

    let mut seen_untouched = false;
    for lot in ordered {
        if seen_untouched {
            assert!(
                lot.is_untouched(),
                "Lot {} was consumed before an older untouched lot",
                lot.id
            );
        }
        if lot.is_untouched() {
            seen_untouched = true;
        }
    }
}
