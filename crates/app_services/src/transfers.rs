//! Inter-branch stock movements
//!
//! Movements change where stock sits, not what the business owns, so they
//! post no journal entry. The outbound side reports the FIFO cost so the
//! receiving branch can book the lot at the same cost.

use core_kernel::{TransactionScope, UnitOfWorkFactory};
use domain_inventory::{receive, Consumption, ConsumptionRef, InventoryLot, LotSource, ReceiveRequest};
use tracing::{info, instrument};

use crate::documents::{TransferIn, TransferOut};
use crate::error::WorkflowError;
use crate::service::{ensure_unrecorded, shift_on_hand, PosService};
use crate::unit_of_work::Books;

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Ships stock to another branch, draining lots FIFO
    #[instrument(skip(self, transfer), fields(movement_id = %transfer.movement_id, product_id = %transfer.product_id))]
    pub async fn transfer_out(&self, transfer: TransferOut) -> Result<Consumption, WorkflowError> {
        let reference = ConsumptionRef::Movement(transfer.movement_id);
        let mut work = self.begin().await?;
        ensure_unrecorded(&mut work, &reference.to_string(), Some(reference), None).await?;
        let consumption = self
            .engine()
            .consume(&mut work, transfer.product_id, transfer.quantity, reference)
            .await?;
        shift_on_hand(&mut work, transfer.product_id, -transfer.quantity).await?;
        work.commit().await?;

        info!(
            destination = %transfer.destination,
            quantity = transfer.quantity,
            cost = %consumption.total_cost,
            "Stock transferred out"
        );
        Ok(consumption)
    }

    /// Takes in stock shipped from another branch as a new lot
    #[instrument(skip(self, transfer), fields(movement_id = %transfer.movement_id, product_id = %transfer.product_id))]
    pub async fn transfer_in(&self, transfer: TransferIn) -> Result<InventoryLot, WorkflowError> {
        let source = LotSource::Movement(transfer.movement_id);
        let mut work = self.begin().await?;
        ensure_unrecorded(&mut work, &source.to_string(), None, Some(source)).await?;
        let lot = receive(
            &mut work,
            ReceiveRequest::new(transfer.product_id, transfer.quantity, transfer.unit_cost, source),
        )
        .await?;
        shift_on_hand(&mut work, transfer.product_id, transfer.quantity).await?;
        work.commit().await?;

        info!(origin = %transfer.origin, lot_id = %lot.id, "Stock transferred in");
        Ok(lot)
    }
}
