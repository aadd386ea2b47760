//! Opening balance import
//!
//! Spreadsheet rows arrive as raw text. They are committed in batches of
//! `import_batch_size`, each batch in its own unit of work, so one bad row
//! costs only its batch. Every committed batch posts
//! `Inventory D / Opening Balance Equity C` for the value it brought in.

use core_kernel::{parse_amount, parse_units, Money, TransactionScope, UnitOfWorkFactory};
use domain_inventory::{receive, InventoryStore, LotSource, ReceiveRequest};
use domain_ledger::{ledger, EntryDraft};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::documents::OpeningBalanceRow;
use crate::error::WorkflowError;
use crate::service::{shift_on_hand, PosService};
use crate::unit_of_work::Books;

/// A batch that was rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// 1-based batch number
    pub batch: usize,
    /// 1-based row numbers covered by the batch
    pub rows: (usize, usize),
    /// The row that failed, when the failure is tied to one
    pub failed_row: Option<usize>,
    pub error: String,
}

/// Summary of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub batches_committed: usize,
    pub rows_imported: usize,
    pub total_value: Money,
    pub failures: Vec<BatchFailure>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Imports opening stock, batch by batch
    ///
    /// Never fails as a whole: batches that could not be committed are
    /// listed in the report and the rest of the import carries on.
    #[instrument(skip(self, rows), fields(rows = rows.len(), batch_size = self.config().import_batch_size))]
    pub async fn import_opening_balances(&self, rows: &[OpeningBalanceRow]) -> ImportReport {
        let batch_size = self.config().import_batch_size.max(1);
        let mut report = ImportReport::default();

        for (index, chunk) in rows.chunks(batch_size).enumerate() {
            let batch = index + 1;
            let first_row = index * batch_size + 1;
            let last_row = first_row + chunk.len() - 1;

            match self.import_batch(batch, first_row, chunk).await {
                Ok(value) => {
                    report.batches_committed += 1;
                    report.rows_imported += chunk.len();
                    report.total_value += value;
                }
                Err((failed_row, error)) => {
                    warn!(batch, failed_row = ?failed_row, error = %error, "Opening balance batch rolled back");
                    report.failures.push(BatchFailure {
                        batch,
                        rows: (first_row, last_row),
                        failed_row,
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            committed = report.batches_committed,
            failed = report.failures.len(),
            total_value = %report.total_value,
            "Opening balance import finished"
        );
        report
    }

    async fn import_batch(
        &self,
        batch: usize,
        first_row: usize,
        rows: &[OpeningBalanceRow],
    ) -> Result<Money, BatchError> {
        let mut work = self.begin().await.map_err(whole_batch)?;

        let mut value = Money::zero();
        for (offset, row) in rows.iter().enumerate() {
            value += import_row(&mut work, row)
                .await
                .map_err(|e| (Some(first_row + offset), e))?;
        }

        if !value.is_zero() {
            let accounts = self.accounts();
            let draft = EntryDraft::new(format!("Opening balance import batch {batch}"))
                .debit(&accounts.inventory, value)
                .credit(&accounts.opening_balance_equity, value);
            ledger::post(&mut work, draft).await.map_err(whole_batch)?;
        }

        work.commit().await.map_err(whole_batch)?;
        Ok(value)
    }
}

/// A batch error with the failing row, if any
type BatchError = (Option<usize>, WorkflowError);

fn whole_batch(error: impl Into<WorkflowError>) -> BatchError {
    (None, error.into())
}

/// Receives one row as an opening balance lot and returns its value
async fn import_row<S>(store: &mut S, row: &OpeningBalanceRow) -> Result<Money, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    let quantity = parse_units(row.quantity.as_str())?;
    let unit_cost = parse_amount(row.unit_cost.as_str())?;

    let lot = receive(
        &mut *store,
        ReceiveRequest::new(row.product_id, quantity, unit_cost, LotSource::OpeningBalance),
    )
    .await?;
    shift_on_hand(&mut *store, row.product_id, quantity).await?;
    Ok(lot.unit_cost.checked_times(quantity)?)
}
