//! Workflow tests against the in-memory books

use std::time::Duration;

use app_services::unit_of_work::mock::InMemoryBooks;
use app_services::{
    AdjustmentRequest, Discount, OpeningBalanceRow, PosService, PurchaseRequest, SaleRequest, ServiceConfig,
    TransferIn, TransferOut, VoidRequest, WorkflowError,
};
use core_kernel::{
    AdjustmentId, ArInvoiceId, Money, MovementId, PortError, ProductId, PurchaseId, SaleId, UnitOfWorkFactory,
};
use domain_inventory::{InventoryError, LotSource};
use domain_ledger::ports::mock::InMemoryJournal;
use domain_ledger::{AccountFilter, AggregateWindow, JournalEntry, JournalLine, LedgerError};
use rust_decimal_macros::dec;
use test_utils::{
    assert_entry_balanced, assert_fifo_drain_order, assert_lot_bounds, assert_on_hand_matches_lots,
    two_lot_stock, AccountFixtures, IdFixtures, MoneyFixtures, ProductBuilder, StockBuilder, CHART,
};

fn money(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount)
}

/// Product 1 with lot A 10 @ 5.00 then lot B 10 @ 7.00
async fn stocked() -> (PosService<InMemoryBooks>, InMemoryBooks) {
    let books = InMemoryBooks::from_parts(two_lot_stock().await, InMemoryJournal::new());
    (PosService::new(books.clone(), ServiceConfig::default()), books)
}

fn line<'a>(entry: &'a JournalEntry, account_code: &str) -> &'a JournalLine {
    entry
        .lines
        .iter()
        .find(|l| l.account_code == account_code)
        .unwrap_or_else(|| panic!("no line for account {account_code} in {:?}", entry.lines))
}

fn reason(text: &str) -> VoidRequest {
    VoidRequest::new(text).by(IdFixtures::cashier())
}

mod sales {
    use super::*;

    #[tokio::test]
    async fn test_standard_sale_uses_chart_accounts() {
        let (service, _) = stocked().await;

        let sale = service
            .record_sale(IdFixtures::sale(), SaleRequest::new().line(IdFixtures::product(), 2, dec!(56.00)))
            .await
            .unwrap();

        assert_eq!(sale.totals.total, MoneyFixtures::gross_112());
        assert_eq!(sale.totals.net, MoneyFixtures::net_100());
        assert_eq!(sale.totals.vat, MoneyFixtures::vat_12());
        assert_eq!(sale.cost_of_goods, MoneyFixtures::cost_5().checked_times(2).unwrap());

        assert_eq!(line(&sale.entry, AccountFixtures::cash()).debit, MoneyFixtures::gross_112());
        assert_eq!(line(&sale.entry, AccountFixtures::sales_revenue()).credit, MoneyFixtures::net_100());
        assert_eq!(line(&sale.entry, AccountFixtures::vat_payable()).credit, MoneyFixtures::vat_12());
        assert_eq!(line(&sale.entry, AccountFixtures::cogs()).debit, MoneyFixtures::cost_5().checked_times(2).unwrap());
        assert_eq!(line(&sale.entry, AccountFixtures::inventory()).credit, MoneyFixtures::cost_5().checked_times(2).unwrap());
        for posted in &sale.entry.lines {
            assert!(CHART.iter().any(|a| a.code == posted.account_code), "{} not in chart", posted.account_code);
        }
    }

    #[tokio::test]
    async fn test_sale_posts_revenue_vat_and_fifo_cost() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();

        let sale = service
            .record_sale(SaleId::new(1), SaleRequest::new().line(product, 15, dec!(11.20)))
            .await
            .unwrap();

        assert_eq!(sale.totals.total, money(dec!(168.00)));
        assert_eq!(sale.cost_of_goods, money(dec!(85.00)));
        assert_entry_balanced(&sale.entry);
        assert_eq!(sale.entry.source_ref.as_deref(), Some("sale:1"));
        assert_eq!(sale.entry.description, "Sale #1");

        assert_eq!(line(&sale.entry, "101").debit, money(dec!(168.00)));
        assert_eq!(line(&sale.entry, "501").debit, money(dec!(85.00)));
        assert_eq!(line(&sale.entry, "401").credit, money(dec!(150.00)));
        assert_eq!(line(&sale.entry, "601").credit, money(dec!(18.00)));
        assert_eq!(line(&sale.entry, "120").credit, money(dec!(85.00)));

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&product].quantity_on_hand, 5);
        assert_on_hand_matches_lots(&state, product);
        assert_fifo_drain_order(&state.lots.values().cloned().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_discounted_sale_books_discount_as_expense() {
        let (service, _) = stocked().await;

        let sale = service
            .record_sale(
                SaleId::new(2),
                SaleRequest::new()
                    .line(IdFixtures::product(), 1, dec!(112.00))
                    .discount(Discount::Percent(dec!(10))),
            )
            .await
            .unwrap();

        assert_entry_balanced(&sale.entry);
        assert_eq!(line(&sale.entry, "101").debit, money(dec!(100.80)));
        assert_eq!(line(&sale.entry, "407").debit, money(dec!(11.20)));
        assert_eq!(line(&sale.entry, "401").credit, money(dec!(101.20)));
        assert_eq!(line(&sale.entry, "601").credit, money(dec!(10.80)));
        assert_eq!(line(&sale.entry, "501").debit, money(dec!(5.00)));
    }

    #[tokio::test]
    async fn test_ar_invoice_debits_receivables() {
        let (service, _) = stocked().await;

        let invoice = service
            .bill_ar_invoice(
                ArInvoiceId::new(3),
                SaleRequest::new()
                    .line(IdFixtures::product(), 2, dec!(56.00))
                    .memo("Dela Cruz Trading"),
            )
            .await
            .unwrap();

        assert_eq!(invoice.entry.description, "AR Invoice #3 - Dela Cruz Trading");
        assert_eq!(invoice.entry.source_ref.as_deref(), Some("ar_invoice:3"));
        assert_eq!(line(&invoice.entry, "110").debit, money(dec!(112.00)));
        assert_eq!(invoice.cost_of_goods, money(dec!(10.00)));
        assert!(invoice.entry.lines.iter().all(|l| l.account_code != "101"));
    }

    #[tokio::test]
    async fn test_shortage_leaves_books_untouched() {
        let (service, books) = stocked().await;
        let before = books.inventory_snapshot().await;

        let result = service
            .record_sale(SaleId::new(4), SaleRequest::new().line(IdFixtures::product(), 25, dec!(10.00)))
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::Inventory(InventoryError::PartialStockDepletion { consumed: 20, .. }))
        ));
        assert_eq!(books.inventory_snapshot().await, before);
        assert!(books.journal_snapshot().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_failing_second_line_rolls_back_the_first() {
        let product = IdFixtures::product();
        let other = IdFixtures::other_product();
        let stock = StockBuilder::new()
            .product(ProductBuilder::new(product))
            .product(ProductBuilder::new(other))
            .lot(product, 10, dec!(5.00))
            .build()
            .await;
        let books = InMemoryBooks::from_parts(stock, InMemoryJournal::new());
        let service = PosService::new(books.clone(), ServiceConfig::default());

        let result = service
            .record_sale(
                SaleId::new(5),
                SaleRequest::new().line(product, 4, dec!(9.00)).line(other, 1, dec!(9.00)),
            )
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::Inventory(InventoryError::OutOfStock { .. }))
        ));
        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&product].quantity_on_hand, 10);
        assert!(state.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_same_sale_cannot_be_recorded_twice() {
        let (service, _) = stocked().await;
        let request = SaleRequest::new().line(IdFixtures::product(), 1, dec!(10.00));

        service.record_sale(SaleId::new(6), request.clone()).await.unwrap();
        let again = service.record_sale(SaleId::new(6), request).await;

        assert!(matches!(again, Err(WorkflowError::AlreadyRecorded(_))));
    }

    #[tokio::test]
    async fn test_busy_books_time_out() {
        let books = InMemoryBooks::from_parts(two_lot_stock().await, InMemoryJournal::new())
            .with_lock_timeout(Duration::from_millis(50));
        let service = PosService::new(books.clone(), ServiceConfig::default());
        let _held = books.begin().await.unwrap();

        let result = service
            .record_sale(SaleId::new(7), SaleRequest::new().line(IdFixtures::product(), 1, dec!(1.00)))
            .await;

        match result {
            Err(err @ WorkflowError::Port(PortError::Timeout { duration_ms: 50, .. })) => {
                assert!(err.is_retryable())
            }
            other => panic!("Expected a timeout, got {other:?}"),
        }
    }
}

mod purchasing {
    use super::*;

    #[tokio::test]
    async fn test_credit_purchase_books_payable_with_input_vat() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();

        let purchase = service
            .receive_purchase(PurchaseRequest::new(PurchaseId::new(50), "Acme Supply").line(product, 10, dec!(5.00)))
            .await
            .unwrap();

        let entry = purchase.entry.expect("purchase entry");
        assert_eq!(entry.description, "Purchase #50 - Acme Supply (Credit)");
        assert_eq!(line(&entry, "120").debit, money(dec!(50.00)));
        assert_eq!(line(&entry, "602").debit, money(dec!(6.00)));
        assert_eq!(line(&entry, "201").credit, money(dec!(56.00)));

        assert_eq!(purchase.lots.len(), 1);
        assert_eq!(purchase.lots[0].source, LotSource::Purchase(PurchaseId::new(50)));

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&product].quantity_on_hand, 30);
        assert_on_hand_matches_lots(&state, product);
    }

    #[tokio::test]
    async fn test_cash_purchase_without_vat() {
        let (service, _) = stocked().await;

        let purchase = service
            .receive_purchase(
                PurchaseRequest::new(PurchaseId::new(51), "Market")
                    .line(IdFixtures::product(), 4, dec!(2.50))
                    .paid_in_cash()
                    .non_vatable(),
            )
            .await
            .unwrap();

        let entry = purchase.entry.expect("purchase entry");
        assert_eq!(entry.lines.len(), 2);
        assert_eq!(line(&entry, "101").credit, money(dec!(10.00)));
        assert!(purchase.vat.is_zero());
    }

    #[tokio::test]
    async fn test_sub_cent_cost_books_what_the_lot_is_worth() {
        let (service, _) = stocked().await;

        let purchase = service
            .receive_purchase(
                PurchaseRequest::new(PurchaseId::new(53), "Market")
                    .line(IdFixtures::product(), 3, dec!(1.005))
                    .paid_in_cash()
                    .non_vatable(),
            )
            .await
            .unwrap();

        let lot_value = purchase.lots[0].remaining_value().unwrap();
        assert_eq!(lot_value, money(dec!(3.03)));
        let entry = purchase.entry.expect("purchase entry");
        assert_eq!(line(&entry, "120").debit, lot_value);
        assert_eq!(purchase.net, lot_value);
    }

    #[tokio::test]
    async fn test_free_delivery_cannot_be_received_twice() {
        let (service, books) = stocked().await;
        let request = PurchaseRequest::new(PurchaseId::new(54), "Promo Supplier").line(IdFixtures::product(), 5, dec!(0));

        let first = service.receive_purchase(request.clone()).await.unwrap();
        assert!(first.entry.is_none());

        let again = service.receive_purchase(request).await;
        assert!(matches!(again, Err(WorkflowError::AlreadyRecorded(_))));
        assert_eq!(books.inventory_snapshot().await.products[&IdFixtures::product()].quantity_on_hand, 25);
    }

    #[tokio::test]
    async fn test_purchase_of_unknown_product_fails() {
        let (service, books) = stocked().await;

        let result = service
            .receive_purchase(PurchaseRequest::new(PurchaseId::new(52), "Acme").line(ProductId::new(99), 1, dec!(1)))
            .await;

        assert!(matches!(result, Err(WorkflowError::Inventory(InventoryError::NotFound(_)))));
        assert!(books.journal_snapshot().await.entries.is_empty());
    }
}

mod adjustments {
    use super::*;

    fn adjustment(id: i64, quantity: i64) -> AdjustmentRequest {
        AdjustmentRequest {
            adjustment_id: AdjustmentId::new(id),
            product_id: IdFixtures::product(),
            quantity,
            reason: "Cycle count".to_string(),
        }
    }

    #[tokio::test]
    async fn test_gain_creates_lot_at_product_cost() {
        let (service, books) = stocked().await;

        let posted = service.adjust_stock(adjustment(1, 5)).await.unwrap();

        assert_eq!(posted.value, money(dec!(20.00)));
        let entry = posted.entry.expect("gain entry");
        assert_eq!(entry.description, "Stock Adjustment #1 - Gain for Product 1: Cycle count");
        assert_eq!(line(&entry, "120").debit, money(dec!(20.00)));
        assert_eq!(line(&entry, "406").credit, money(dec!(20.00)));

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&IdFixtures::product()].quantity_on_hand, 25);
        assert_lot_bounds(&state);
    }

    #[tokio::test]
    async fn test_loss_drains_oldest_lots() {
        let (service, _) = stocked().await;

        let posted = service.adjust_stock(adjustment(2, -12)).await.unwrap();

        assert_eq!(posted.value, money(dec!(64.00)));
        let entry = posted.entry.expect("loss entry");
        assert_eq!(line(&entry, "505").debit, money(dec!(64.00)));
        assert_eq!(line(&entry, "120").credit, money(dec!(64.00)));
        assert_eq!(posted.consumption.map(|c| c.lots_touched()), Some(2));
    }

    #[tokio::test]
    async fn test_rejects_zero_quantity_and_blank_reason() {
        let (service, _) = stocked().await;

        let zero = service.adjust_stock(adjustment(3, 0)).await;
        assert!(matches!(zero, Err(WorkflowError::Inventory(InventoryError::InvalidQuantity(_)))));

        let blank = service
            .adjust_stock(AdjustmentRequest {
                reason: "  ".to_string(),
                ..adjustment(3, 1)
            })
            .await;
        assert!(matches!(blank, Err(WorkflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_void_gain_withdraws_untouched_lot() {
        let (service, books) = stocked().await;
        service.adjust_stock(adjustment(4, 5)).await.unwrap();

        let outcome = service
            .void_adjustment(AdjustmentId::new(4), reason("Counted twice"))
            .await
            .unwrap();

        assert_eq!(outcome.lots_removed.len(), 1);
        assert!(outcome.reversal.is_some());
        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&IdFixtures::product()].quantity_on_hand, 20);
        assert_eq!(state.lots.len(), 2);
    }

    #[tokio::test]
    async fn test_void_gain_refused_once_consumed() {
        let product = IdFixtures::other_product();
        let stock = StockBuilder::new().product(ProductBuilder::new(product)).build().await;
        let books = InMemoryBooks::from_parts(stock, InMemoryJournal::new());
        let service = PosService::new(books.clone(), ServiceConfig::default());

        service
            .adjust_stock(AdjustmentRequest {
                adjustment_id: AdjustmentId::new(5),
                product_id: product,
                quantity: 5,
                reason: "Found in back room".to_string(),
            })
            .await
            .unwrap();
        service
            .record_sale(SaleId::new(1), SaleRequest::new().line(product, 2, dec!(9.00)))
            .await
            .unwrap();
        let before = books.journal_snapshot().await;

        let result = service.void_adjustment(AdjustmentId::new(5), reason("Mistake")).await;

        assert!(matches!(result, Err(WorkflowError::StockAlreadyConsumed(_))));
        assert_eq!(books.journal_snapshot().await, before);
    }
}

mod transfers {
    use super::*;

    #[tokio::test]
    async fn test_transfer_out_and_void() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();

        let shipped = service
            .transfer_out(TransferOut {
                movement_id: MovementId::new(1),
                product_id: product,
                quantity: 12,
                destination: "Branch 2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(shipped.total_cost, money(dec!(64.00)));
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 8);
        assert!(books.journal_snapshot().await.entries.is_empty());

        let outcome = service.void_transfer(MovementId::new(1), reason("Truck cancelled")).await.unwrap();
        assert_eq!(outcome.restored.get(&product), Some(&12));
        assert!(outcome.reversal.is_none());
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 20);
    }

    #[tokio::test]
    async fn test_movement_cannot_be_recorded_twice() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();
        let shipment = TransferOut {
            movement_id: MovementId::new(3),
            product_id: product,
            quantity: 2,
            destination: "Branch 2".to_string(),
        };
        let arrival = TransferIn {
            movement_id: MovementId::new(4),
            product_id: product,
            quantity: 1,
            unit_cost: dec!(6.00),
            origin: "Main warehouse".to_string(),
        };
        service.transfer_out(shipment.clone()).await.unwrap();
        service.transfer_in(arrival.clone()).await.unwrap();

        let again_out = service.transfer_out(shipment.clone()).await;
        let again_in = service.transfer_in(arrival).await;

        assert!(matches!(again_out, Err(WorkflowError::AlreadyRecorded(_))));
        assert!(matches!(again_in, Err(WorkflowError::AlreadyRecorded(_))));
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 19);

        service.void_transfer(MovementId::new(3), reason("Truck cancelled")).await.unwrap();
        assert!(service.transfer_out(shipment).await.is_ok());
    }

    #[tokio::test]
    async fn test_transfer_in_and_void() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();

        let lot = service
            .transfer_in(TransferIn {
                movement_id: MovementId::new(2),
                product_id: product,
                quantity: 3,
                unit_cost: dec!(6.00),
                origin: "Main warehouse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(lot.source, LotSource::Movement(MovementId::new(2)));
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 23);

        let outcome = service.void_transfer(MovementId::new(2), reason("Wrong branch")).await.unwrap();
        assert_eq!(outcome.lots_removed.len(), 1);
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 20);
    }
}

mod voids {
    use super::*;

    #[tokio::test]
    async fn test_void_sale_restores_stock_and_clears_reports() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();
        service
            .record_sale(SaleId::new(1), SaleRequest::new().line(product, 15, dec!(11.20)))
            .await
            .unwrap();

        let outcome = service
            .void_sale(SaleId::new(1), reason("Customer returned goods"))
            .await
            .unwrap();

        assert_eq!(outcome.restored.get(&product), Some(&15));
        let reversal = outcome.reversal.expect("reversal entry");
        assert_eq!(reversal.description, "[REVERSAL] Sale #1 - Customer returned goods");
        assert_entry_balanced(&reversal);

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&product].quantity_on_hand, 20);
        assert!(state.transactions.is_empty());

        let balances = service
            .balances(&AccountFilter::All, &AggregateWindow::all())
            .await
            .unwrap();
        assert!(balances.is_empty());

        let journal = books.journal_snapshot().await;
        let original = journal.entries.values().find(|e| e.reversal_of.is_none()).unwrap();
        assert_eq!(original.voided_by, Some(IdFixtures::cashier()));
    }

    #[tokio::test]
    async fn test_void_untouched_purchase_withdraws_its_lots() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();
        service
            .receive_purchase(PurchaseRequest::new(PurchaseId::new(50), "Acme Supply").line(product, 10, dec!(5.00)))
            .await
            .unwrap();

        let outcome = service
            .void_purchase(PurchaseId::new(50), reason("Delivered to wrong branch"))
            .await
            .unwrap();

        assert_eq!(outcome.lots_removed.len(), 1);
        assert!(outcome.restored.is_empty());
        let reversal = outcome.reversal.expect("reversal entry");
        assert_eq!(
            reversal.description,
            "[REVERSAL] Purchase #50 - Acme Supply (Credit) - Delivered to wrong branch"
        );
        assert_eq!(line(&reversal, "201").debit, money(dec!(56.00)));

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&product].quantity_on_hand, 20);
        assert_on_hand_matches_lots(&state, product);
        let balances = service
            .balances(&AccountFilter::All, &AggregateWindow::all())
            .await
            .unwrap();
        assert!(balances.is_empty());
    }

    #[tokio::test]
    async fn test_void_purchase_refused_once_sold_from() {
        let (service, books) = stocked().await;
        let product = IdFixtures::product();
        service
            .receive_purchase(PurchaseRequest::new(PurchaseId::new(50), "Acme Supply").line(product, 10, dec!(5.00)))
            .await
            .unwrap();
        // 20 older units go first, the 21st comes from the purchased lot
        service
            .record_sale(SaleId::new(1), SaleRequest::new().line(product, 21, dec!(11.20)))
            .await
            .unwrap();
        let before = books.journal_snapshot().await;

        let result = service.void_purchase(PurchaseId::new(50), reason("Supplier recall")).await;

        assert!(matches!(result, Err(WorkflowError::StockAlreadyConsumed(_))));
        assert_eq!(books.journal_snapshot().await, before);
        assert_eq!(books.inventory_snapshot().await.products[&product].quantity_on_hand, 9);
    }

    #[tokio::test]
    async fn test_second_void_finds_nothing() {
        let (service, _) = stocked().await;
        service
            .record_sale(SaleId::new(1), SaleRequest::new().line(IdFixtures::product(), 1, dec!(5.00)))
            .await
            .unwrap();
        service.void_sale(SaleId::new(1), reason("Test sale")).await.unwrap();

        let again = service.void_sale(SaleId::new(1), reason("Test sale")).await;
        assert!(matches!(again, Err(WorkflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_void_requires_reason() {
        let (service, _) = stocked().await;
        let result = service.void_sale(SaleId::new(1), VoidRequest::new("")).await;
        assert!(matches!(result, Err(WorkflowError::Ledger(LedgerError::MissingReason))));
    }

    #[tokio::test]
    async fn test_voided_sale_id_can_be_recorded_again() {
        let (service, _) = stocked().await;
        let request = SaleRequest::new().line(IdFixtures::product(), 1, dec!(5.00));
        service.record_sale(SaleId::new(9), request.clone()).await.unwrap();
        service.void_sale(SaleId::new(9), reason("Wrong price")).await.unwrap();

        let again = service.record_sale(SaleId::new(9), request).await;
        assert!(again.is_ok());
    }
}

mod opening_balances {
    use super::*;

    #[tokio::test]
    async fn test_bad_row_costs_only_its_batch() {
        let first = IdFixtures::product();
        let second = IdFixtures::other_product();
        let stock = StockBuilder::new()
            .product(ProductBuilder::new(first))
            .product(ProductBuilder::new(second))
            .build()
            .await;
        let books = InMemoryBooks::from_parts(stock, InMemoryJournal::new());
        let service = PosService::new(books.clone(), ServiceConfig::default().with_import_batch_size(2));

        let rows = vec![
            OpeningBalanceRow::new(first, "10", "5.00"),
            OpeningBalanceRow::new(second, "1,200", "0.50"),
            OpeningBalanceRow::new(first, "1.5", "2"),
            OpeningBalanceRow::new(second, "3", "1.00"),
            OpeningBalanceRow::new(first, "4", "2.25"),
        ];
        let report = service.import_opening_balances(&rows).await;

        assert_eq!(report.batches_committed, 2);
        assert_eq!(report.rows_imported, 3);
        assert_eq!(report.total_value, money(dec!(659.00)));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].batch, 2);
        assert_eq!(report.failures[0].rows, (3, 4));
        assert_eq!(report.failures[0].failed_row, Some(3));
        assert!(!report.is_complete());

        let state = books.inventory_snapshot().await;
        assert_eq!(state.products[&first].quantity_on_hand, 14);
        assert_eq!(state.products[&second].quantity_on_hand, 1200);
        assert!(state.lots.values().all(|l| l.is_opening_balance));

        let balances = service
            .balances(&AccountFilter::code("302"), &AggregateWindow::all())
            .await
            .unwrap();
        assert_eq!(balances["302"].credit, money(dec!(659.00)));
    }
}

mod reporting {
    use super::*;

    #[tokio::test]
    async fn test_reconcile_and_lot_listing() {
        let (service, _) = stocked().await;
        service
            .record_sale(SaleId::new(1), SaleRequest::new().line(IdFixtures::product(), 12, dec!(9.00)))
            .await
            .unwrap();

        assert!(service.reconcile(None).await.unwrap().is_empty());
        let report = service.reconcile(Some(IdFixtures::product())).await.unwrap();
        assert!(report[0].is_balanced);

        let lots = service.lots(IdFixtures::product()).await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].quantity_remaining, 8);
        assert_eq!(lots[0].unit_cost, money(dec!(7.00)));
    }

    #[tokio::test]
    async fn test_lots_of_unknown_product() {
        let (service, _) = stocked().await;
        let result = service.lots(ProductId::new(404)).await;
        assert!(matches!(result, Err(WorkflowError::Inventory(InventoryError::NotFound(_)))));
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{consumption_plan_strategy, lots_strategy, product_name, vat_percentage_strategy};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn sales_and_voids_conserve_stock(plan in consumption_plan_strategy(6)) {
            runtime().block_on(async {
                let (service, books) = stocked().await;
                let product = IdFixtures::product();
                let mut recorded = Vec::new();

                for (index, quantity) in plan.iter().enumerate() {
                    let sale_id = SaleId::new(index as i64 + 1);
                    let request = SaleRequest::new().line(product, *quantity, dec!(9.99));
                    match service.record_sale(sale_id, request).await {
                        Ok(_) => recorded.push(sale_id),
                        Err(WorkflowError::Inventory(e)) => assert!(e.is_stock_shortage()),
                        Err(other) => panic!("unexpected error {other}"),
                    }
                }

                let state = books.inventory_snapshot().await;
                assert_on_hand_matches_lots(&state, product);
                assert_lot_bounds(&state);
                for entry in books.journal_snapshot().await.entries.values() {
                    assert_entry_balanced(entry);
                }

                for sale_id in recorded {
                    service.void_sale(sale_id, VoidRequest::new("undo")).await.unwrap();
                }
                let state = books.inventory_snapshot().await;
                assert_eq!(state.products[&product].quantity_on_hand, 20);
                assert!(state.lots.values().all(|l| l.is_untouched()));
            });
        }

        #[test]
        fn selling_everything_costs_what_was_bought(lots in lots_strategy(5), vat in vat_percentage_strategy()) {
            runtime().block_on(async {
                let product = IdFixtures::product();
                let stock = StockBuilder::new()
                    .product(ProductBuilder::new(product).with_name(product_name()).with_unit_cost(dec!(3.00)))
                    .build()
                    .await;
                let books = InMemoryBooks::from_parts(stock, InMemoryJournal::new());
                let service = PosService::new(books.clone(), ServiceConfig::default().with_vat_percentage(vat));

                let mut bought = Money::zero();
                let mut units = 0;
                for (index, (quantity, unit_cost)) in lots.iter().enumerate() {
                    let purchase = service
                        .receive_purchase(
                            PurchaseRequest::new(PurchaseId::new(index as i64 + 1), product_name())
                                .line(product, *quantity, *unit_cost),
                        )
                        .await
                        .unwrap();
                    if let Some(entry) = &purchase.entry {
                        assert_entry_balanced(entry);
                    }
                    bought += purchase.net;
                    units += quantity;
                }

                let sale = service
                    .record_sale(SaleId::new(1), SaleRequest::new().line(product, units, dec!(1.00)))
                    .await
                    .unwrap();

                assert_eq!(sale.cost_of_goods, bought);
                assert_entry_balanced(&sale.entry);
                let state = books.inventory_snapshot().await;
                assert_eq!(state.products[&product].quantity_on_hand, 0);
                assert_lot_bounds(&state);
            });
        }
    }
}
