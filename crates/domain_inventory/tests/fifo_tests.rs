//! Tests for lot receipt and FIFO consumption
//!
//! Tests run against the in-memory store; each scenario opens a unit of
//! work, performs the operation and inspects the committed state.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use core_kernel::{
    AdjustmentId, LotId, Money, PortError, ProductId, PurchaseId, SaleId, TransactionScope,
    UnitOfWorkFactory,
};
use domain_inventory::ports::mock::InMemoryInventory;
use domain_inventory::{
    receive, ConsumptionRef, FifoEngine, FifoPolicy, InventoryError, InventoryStore, LotSource,
    ProductStock, ReceiveRequest,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

const PRODUCT: ProductId = ProductId::new(1);

fn product(id: ProductId) -> ProductStock {
    ProductStock {
        id,
        name: format!("Product {}", id.value()),
        quantity_on_hand: 0,
        unit_cost: Money::new(dec!(4.00)),
    }
}

/// Creates a store with one product and one lot per `(quantity, unit_cost)`,
/// each lot one minute younger than the previous
async fn store_with_lots(lots: &[(i64, Decimal)]) -> (InMemoryInventory, Vec<LotId>) {
    let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    let mut ids = Vec::new();

    let mut work = store.begin().await.unwrap();
    for (i, (quantity, cost)) in lots.iter().enumerate() {
        let request = ReceiveRequest::new(PRODUCT, *quantity, *cost, LotSource::Purchase(PurchaseId::new(1)))
            .received_at(base + ChronoDuration::minutes(i as i64));
        ids.push(receive(&mut work, request).await.unwrap().id);
        work.adjust_quantity_on_hand(PRODUCT, *quantity).await.unwrap();
    }
    work.commit().await.unwrap();

    (store, ids)
}

fn sale(id: i64) -> ConsumptionRef {
    ConsumptionRef::Sale(SaleId::new(id))
}

mod receiving {
    use super::*;

    #[tokio::test]
    async fn test_receive_creates_full_lot() {
        let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
        let mut work = store.begin().await.unwrap();

        let lot = receive(
            &mut work,
            ReceiveRequest::new(PRODUCT, 12, dec!(3.455), LotSource::Purchase(PurchaseId::new(7))),
        )
        .await
        .unwrap();

        assert_eq!(lot.quantity_received, 12);
        assert_eq!(lot.quantity_remaining, 12);
        assert_eq!(lot.unit_cost, Money::new(dec!(3.46)));
        assert!(!lot.is_opening_balance);
        // on-hand is the caller's job
        assert_eq!(work.find_product(PRODUCT).await.unwrap().unwrap().quantity_on_hand, 0);
    }

    #[tokio::test]
    async fn test_receive_unknown_product() {
        let store = InMemoryInventory::new();
        let mut work = store.begin().await.unwrap();

        let result = receive(
            &mut work,
            ReceiveRequest::new(ProductId::new(99), 1, dec!(1), LotSource::OpeningBalance),
        )
        .await;

        assert!(matches!(result, Err(InventoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_receive_rejects_non_positive_quantity() {
        let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
        let mut work = store.begin().await.unwrap();

        let result = receive(
            &mut work,
            ReceiveRequest::new(PRODUCT, 0, dec!(1), LotSource::Adjustment(AdjustmentId::new(1))),
        )
        .await;

        assert!(matches!(result, Err(InventoryError::InvalidQuantity(_))));
        assert!(work.state().lots.is_empty());
    }

    #[tokio::test]
    async fn test_receive_rejects_negative_cost() {
        let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
        let mut work = store.begin().await.unwrap();

        let result = receive(
            &mut work,
            ReceiveRequest::new(PRODUCT, 3, dec!(-1), LotSource::OpeningBalance),
        )
        .await;

        assert!(matches!(result, Err(InventoryError::InvalidCost(_))));
    }
}

mod consumption {
    use super::*;

    #[tokio::test]
    async fn test_oldest_lot_drained_first() {
        let (store, lots) = store_with_lots(&[(5, dec!(1.00)), (3, dec!(2.00)), (7, dec!(3.00))]).await;
        let engine = FifoEngine::default();

        let mut work = store.begin().await.unwrap();
        let consumption = engine.consume(&mut work, PRODUCT, 6, sale(1)).await.unwrap();
        work.commit().await.unwrap();

        assert_eq!(consumption.lots_touched(), 2);
        assert_eq!(consumption.transactions[0].lot_id, lots[0]);
        assert_eq!(consumption.transactions[0].quantity_used, 5);
        assert_eq!(consumption.transactions[1].lot_id, lots[1]);
        assert_eq!(consumption.transactions[1].quantity_used, 1);
        assert_eq!(consumption.total_cost, Money::new(dec!(7.00)));

        let state = store.snapshot().await;
        let remaining: Vec<i64> = lots.iter().map(|id| state.lots[id].quantity_remaining).collect();
        assert_eq!(remaining, vec![0, 2, 7]);
    }

    #[tokio::test]
    async fn test_cost_spans_two_lots() {
        let (store, _) = store_with_lots(&[(10, dec!(5.00)), (10, dec!(7.00))]).await;
        let engine = FifoEngine::default();

        let mut work = store.begin().await.unwrap();
        let consumption = engine.consume(&mut work, PRODUCT, 15, sale(2)).await.unwrap();

        assert_eq!(consumption.total_cost, Money::new(dec!(85.00)));
        assert_eq!(consumption.average_unit_cost(), Money::new(dec!(5.67)));
    }

    #[tokio::test]
    async fn test_drained_lots_are_kept() {
        let (store, lots) = store_with_lots(&[(2, dec!(1.00))]).await;
        let engine = FifoEngine::default();

        let mut work = store.begin().await.unwrap();
        engine.consume(&mut work, PRODUCT, 2, sale(3)).await.unwrap();
        work.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.lots[&lots[0]].quantity_remaining, 0);
        assert_eq!(state.lots[&lots[0]].quantity_received, 2);
    }

    #[tokio::test]
    async fn test_backdated_lot_is_consumed_first() {
        let (store, lots) = store_with_lots(&[(4, dec!(2.00))]).await;
        let mut work = store.begin().await.unwrap();
        let early = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let opening = receive(
            &mut work,
            ReceiveRequest::new(PRODUCT, 4, dec!(1.50), LotSource::OpeningBalance).received_at(early),
        )
        .await
        .unwrap();

        let consumption = FifoEngine::default()
            .consume(&mut work, PRODUCT, 4, sale(4))
            .await
            .unwrap();

        assert!(opening.id > lots[0]);
        assert_eq!(consumption.transactions[0].lot_id, opening.id);
        assert_eq!(consumption.total_cost, Money::new(dec!(6.00)));
    }

    #[tokio::test]
    async fn test_equal_timestamps_fall_back_to_id() {
        let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut work = store.begin().await.unwrap();
        let mut ids = Vec::new();
        for cost in [dec!(9.00), dec!(1.00)] {
            let request = ReceiveRequest::new(PRODUCT, 1, cost, LotSource::OpeningBalance).received_at(at);
            ids.push(receive(&mut work, request).await.unwrap().id);
        }

        let consumption = FifoEngine::default()
            .consume(&mut work, PRODUCT, 1, sale(5))
            .await
            .unwrap();

        assert_eq!(consumption.transactions[0].lot_id, ids[0]);
        assert_eq!(consumption.total_cost, Money::new(dec!(9.00)));
    }

    #[tokio::test]
    async fn test_rows_carry_reference() {
        let (store, _) = store_with_lots(&[(3, dec!(1.00)), (3, dec!(1.00))]).await;
        let reference = ConsumptionRef::Adjustment(AdjustmentId::new(8));

        let mut work = store.begin().await.unwrap();
        FifoEngine::default().consume(&mut work, PRODUCT, 4, reference).await.unwrap();

        let rows = work.transactions_for(reference).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.reference == reference));
        assert!(work.transactions_for(sale(1)).await.unwrap().is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_invalid_quantity_before_mutation() {
        let (store, _) = store_with_lots(&[(5, dec!(1.00))]).await;
        let before = store.snapshot().await;

        let mut work = store.begin().await.unwrap();
        let result = FifoEngine::default().consume(&mut work, PRODUCT, 0, sale(1)).await;
        assert!(matches!(result, Err(InventoryError::InvalidQuantity(_))));
        assert_eq!(work.state(), &before);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = InMemoryInventory::new();
        let mut work = store.begin().await.unwrap();
        let result = FifoEngine::default()
            .consume(&mut work, ProductId::new(404), 1, sale(1))
            .await;
        assert!(matches!(result, Err(InventoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_out_of_stock_mutates_nothing() {
        let store = InMemoryInventory::with_products(vec![product(PRODUCT)]).await;
        let before = store.snapshot().await;

        let mut work = store.begin().await.unwrap();
        let result = FifoEngine::default().consume(&mut work, PRODUCT, 1, sale(1)).await;

        assert!(matches!(
            result,
            Err(InventoryError::OutOfStock { requested: 1, .. })
        ));
        assert_eq!(work.state(), &before);
    }

    #[tokio::test]
    async fn test_partial_depletion_rolls_back_on_drop() {
        let (store, _) = store_with_lots(&[(3, dec!(2.00)), (2, dec!(2.50))]).await;
        let before = store.snapshot().await;

        {
            let mut work = store.begin().await.unwrap();
            let result = FifoEngine::default().consume(&mut work, PRODUCT, 6, sale(1)).await;
            match result {
                Err(InventoryError::PartialStockDepletion { requested, consumed, .. }) => {
                    assert_eq!(requested, 6);
                    assert_eq!(consumed, 5);
                }
                other => panic!("Expected PartialStockDepletion, got {other:?}"),
            }
            // dropped without commit
        }

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_excessive_fragmentation() {
        let (store, _) = store_with_lots(&[(1, dec!(1.00)), (1, dec!(1.00)), (1, dec!(1.00))]).await;
        let engine = FifoEngine::new(FifoPolicy { max_lots_per_call: 2 });

        let mut work = store.begin().await.unwrap();
        let result = engine.consume(&mut work, PRODUCT, 3, sale(1)).await;
        assert!(matches!(
            result,
            Err(InventoryError::ExcessiveFragmentation { max_lots: 2, .. })
        ));
        drop(work);

        let mut work = store.begin().await.unwrap();
        assert!(engine.consume(&mut work, PRODUCT, 2, sale(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cost_beyond_decimal_range_is_an_error() {
        let units = 9_000_000_000_000_000_000;
        let (store, _) = store_with_lots(&[(units, dec!(10000000000.00))]).await;
        let before = store.snapshot().await;

        {
            let mut work = store.begin().await.unwrap();
            let engine = FifoEngine::default();

            let preview = engine.preview_cost(&mut work, PRODUCT, units).await;
            assert!(matches!(preview, Err(InventoryError::CostOverflow { product_id: PRODUCT, .. })));

            let result = engine.consume(&mut work, PRODUCT, units, sale(1)).await;
            assert!(matches!(result, Err(InventoryError::CostOverflow { product_id: PRODUCT, .. })));
        }

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_concurrent_unit_of_work_times_out() {
        let (store, _) = store_with_lots(&[(5, dec!(1.00))]).await;
        let store = store.with_lock_timeout(Duration::from_millis(20));

        let _holder = store.begin().await.unwrap();
        let err = store.begin().await.unwrap_err();

        assert!(matches!(err, PortError::Timeout { duration_ms: 20, .. }));
        let mapped = InventoryError::storage("consume PRD-1 x 1", err);
        assert!(matches!(mapped, InventoryError::LockTimeout { waited_ms: 20, .. }));
    }
}

mod preview {
    use super::*;

    #[tokio::test]
    async fn test_preview_matches_consumption_without_mutating() {
        let (store, _) = store_with_lots(&[(10, dec!(5.00)), (10, dec!(7.00))]).await;
        let before = store.snapshot().await;
        let engine = FifoEngine::default();

        let mut work = store.begin().await.unwrap();
        let preview = engine.preview_cost(&mut work, PRODUCT, 15).await.unwrap();
        assert_eq!(work.state(), &before);

        assert!(preview.is_fully_covered());
        assert_eq!(preview.estimated_cost, Money::new(dec!(85.00)));
        let actual = engine.consume(&mut work, PRODUCT, 15, sale(1)).await.unwrap();
        assert_eq!(actual.total_cost, preview.estimated_cost);
    }

    #[tokio::test]
    async fn test_preview_stops_at_available_stock() {
        let (store, _) = store_with_lots(&[(4, dec!(2.00))]).await;
        let mut work = store.begin().await.unwrap();

        let preview = FifoEngine::default().preview_cost(&mut work, PRODUCT, 10).await.unwrap();

        assert_eq!(preview.available, 4);
        assert!(!preview.is_fully_covered());
        assert_eq!(preview.estimated_cost, Money::new(dec!(8.00)));
    }
}

mod proptests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn consumption_conserves_units(
            lots in prop::collection::vec((1_i64..50, 0_i64..10_000), 1..8),
            draws in prop::collection::vec(1_i64..40, 1..8),
        ) {
            let lots: Vec<(i64, Decimal)> =
                lots.into_iter().map(|(q, cents)| (q, Decimal::new(cents, 2))).collect();
            let received: i64 = lots.iter().map(|(q, _)| q).sum();

            runtime().block_on(async {
                let (store, _) = store_with_lots(&lots).await;
                let engine = FifoEngine::default();
                let mut consumed = 0_i64;

                for (i, draw) in draws.iter().enumerate() {
                    let mut work = store.begin().await.unwrap();
                    match engine.consume(&mut work, PRODUCT, *draw, sale(i as i64)).await {
                        Ok(consumption) => {
                            let rows: i64 = consumption.transactions.iter().map(|t| t.quantity_used).sum();
                            assert_eq!(rows, *draw);
                            let cost: Money = consumption.transactions.iter().map(|t| t.total_cost).sum();
                            assert_eq!(cost, consumption.total_cost);
                            work.commit().await.unwrap();
                            consumed += draw;
                        }
                        Err(err) => assert!(err.is_stock_shortage()),
                    }
                }

                let state = store.snapshot().await;
                let remaining: i64 = state.lots.values().map(|l| l.quantity_remaining).sum();
                let recorded: i64 = state.transactions.values().map(|t| t.quantity_used).sum();
                assert_eq!(remaining + consumed, received);
                assert_eq!(recorded, consumed);
                assert!(state.lots.values().all(|l| l.quantity_remaining >= 0));
            });
        }
    }
}
