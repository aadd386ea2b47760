//! Command dispatch against the in-memory books

use app_services::unit_of_work::mock::InMemoryBooks;
use app_services::{PosService, SaleRequest, ServiceConfig};
use core_kernel::SaleId;
use domain_ledger::ports::mock::InMemoryJournal;
use interface_cli::{execute, BooksCommand, CliError};
use rust_decimal_macros::dec;
use test_utils::{two_lot_stock, IdFixtures};

async fn service() -> PosService<InMemoryBooks> {
    let books = InMemoryBooks::from_parts(two_lot_stock().await, InMemoryJournal::new());
    PosService::new(books, ServiceConfig::default())
}

#[tokio::test]
async fn test_lots_lists_fifo_order() {
    let service = service().await;

    let output = execute(&service, BooksCommand::Lots { product: IdFixtures::product() })
        .await
        .unwrap();

    let lots = output.as_array().unwrap();
    assert_eq!(lots.len(), 2);
    assert_eq!(lots[0]["quantity_remaining"], 10);
    assert_eq!(lots[0]["unit_cost"], "5.00");
    assert_eq!(lots[1]["unit_cost"], "7.00");
}

#[tokio::test]
async fn test_balances_after_a_sale() {
    let service = service().await;
    service
        .record_sale(SaleId::new(1), SaleRequest::new().line(IdFixtures::product(), 15, dec!(11.20)))
        .await
        .unwrap();

    let output = execute(
        &service,
        BooksCommand::Balances {
            account: Some("120".to_string()),
            from: None,
            to: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(output["120"]["credit"], "85.00");
    assert!(output.get("101").is_none());
}

#[tokio::test]
async fn test_reconcile_product_reports_balanced() {
    let service = service().await;

    let output = execute(&service, BooksCommand::Reconcile { product: Some(IdFixtures::product()) })
        .await
        .unwrap();

    assert_eq!(output[0]["is_balanced"], true);
    assert_eq!(output[0]["on_hand"], 20);
}

#[tokio::test]
async fn test_import_from_file() {
    let service = service().await;
    let path = std::env::temp_dir().join(format!("opening-stock-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[{"product_id": 2, "quantity": "3", "unit_cost": "1.50"}]"#,
    )
    .unwrap();

    let output = execute(&service, BooksCommand::Import { file: path.clone() }).await;
    std::fs::remove_file(&path).ok();

    let report = output.unwrap();
    // product 2 is not stocked in the fixture, so the only batch fails
    assert_eq!(report["batches_committed"], 0);
    assert_eq!(report["failures"][0]["failed_row"], 1);
}

#[tokio::test]
async fn test_import_missing_file() {
    let service = service().await;
    let result = execute(
        &service,
        BooksCommand::Import {
            file: "/nonexistent/opening.json".into(),
        },
    )
    .await;
    assert!(matches!(result, Err(CliError::Read { .. })));
}
