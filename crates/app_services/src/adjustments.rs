//! Manual stock adjustments

use core_kernel::{TransactionScope, UnitOfWorkFactory};
use domain_inventory::{receive, ConsumptionRef, InventoryError, LotSource, ReceiveRequest};
use domain_ledger::{ledger, EntryDraft};
use tracing::{info, instrument};

use crate::documents::{AdjustmentRequest, PostedAdjustment};
use crate::error::WorkflowError;
use crate::service::{ensure_unrecorded, require_product, shift_on_hand, PosService};
use crate::unit_of_work::Books;

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Corrects the stock of one product
    ///
    /// A gain becomes a new lot at the product's unit cost and posts
    /// `Inventory D / Inventory Gain C`. A loss drains lots FIFO and posts
    /// `Inventory Loss D / Inventory C` at the drained cost.
    #[instrument(skip(self, request), fields(adjustment_id = %request.adjustment_id, product_id = %request.product_id, quantity = request.quantity))]
    pub async fn adjust_stock(&self, request: AdjustmentRequest) -> Result<PostedAdjustment, WorkflowError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation("a reason for the adjustment is required"));
        }
        if request.quantity == 0 {
            return Err(InventoryError::InvalidQuantity("adjustment quantity cannot be zero".to_string()).into());
        }

        let reference = ConsumptionRef::Adjustment(request.adjustment_id);
        let source_ref = reference.to_string();
        let mut work = self.begin().await?;
        ensure_unrecorded(
            &mut work,
            &source_ref,
            Some(reference),
            Some(LotSource::Adjustment(request.adjustment_id)),
        )
        .await?;
        let product = require_product(&mut work, request.product_id).await?;
        let accounts = self.accounts();

        let (posted, draft) = if request.quantity > 0 {
            let lot = receive(
                &mut work,
                ReceiveRequest::new(
                    product.id,
                    request.quantity,
                    product.unit_cost.amount(),
                    LotSource::Adjustment(request.adjustment_id),
                ),
            )
            .await?;
            let value = lot.unit_cost.checked_times(request.quantity)?;
            let draft = EntryDraft::new(format!(
                "Stock Adjustment #{} - Gain for {}: {reason}",
                request.adjustment_id.value(),
                product.name
            ))
            .debit_nonzero(&accounts.inventory, value)
            .credit_nonzero(&accounts.inventory_gain, value);
            let posted = PostedAdjustment {
                value,
                lot: Some(lot),
                consumption: None,
                entry: None,
            };
            (posted, draft)
        } else {
            let consumption = self
                .engine()
                .consume(
                    &mut work,
                    product.id,
                    request.quantity.abs(),
                    reference,
                )
                .await?;
            let value = consumption.total_cost;
            let draft = EntryDraft::new(format!(
                "Stock Adjustment #{} - Loss for {}: {reason}",
                request.adjustment_id.value(),
                product.name
            ))
            .debit_nonzero(&accounts.inventory_loss, value)
            .credit_nonzero(&accounts.inventory, value);
            let posted = PostedAdjustment {
                value,
                lot: None,
                consumption: Some(consumption),
                entry: None,
            };
            (posted, draft)
        };

        let on_hand = shift_on_hand(&mut work, product.id, request.quantity).await?;
        let entry = if draft.lines.is_empty() {
            None
        } else {
            Some(ledger::post(&mut work, draft.with_source(&source_ref)).await?)
        };
        work.commit().await?;

        info!(value = %posted.value, on_hand, "Stock adjusted");
        Ok(PostedAdjustment { entry, ..posted })
    }
}
