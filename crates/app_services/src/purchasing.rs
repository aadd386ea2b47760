//! Supplier purchases

use core_kernel::{Money, TransactionScope, UnitOfWorkFactory};
use domain_inventory::{receive, InventoryError, LotSource, ReceiveRequest};
use domain_ledger::{ledger, EntryDraft};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::documents::{PaymentTerms, PostedPurchase, PurchaseRequest};
use crate::error::WorkflowError;
use crate::service::{ensure_unrecorded, shift_on_hand, PosService};
use crate::unit_of_work::Books;

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Receives a supplier delivery into stock
    ///
    /// Each line becomes a lot at its VAT-exclusive unit cost. VAT is charged
    /// per line on the rounded line amount. Posts `Inventory D` for the net,
    /// `VAT Input D` for the tax and credits `Cash` or `Accounts Payable`
    /// with the total depending on the payment terms.
    #[instrument(skip(self, request), fields(purchase_id = %request.purchase_id, lines = request.lines.len()))]
    pub async fn receive_purchase(&self, request: PurchaseRequest) -> Result<PostedPurchase, WorkflowError> {
        if request.lines.is_empty() {
            return Err(WorkflowError::validation("a purchase needs at least one line"));
        }

        let rate = self.config().vat_rate();
        let mut net = Money::zero();
        let mut vat = Money::zero();
        for line in &request.lines {
            if line.quantity <= 0 {
                return Err(InventoryError::InvalidQuantity(format!(
                    "purchased quantity must be positive, got {}",
                    line.quantity
                ))
                .into());
            }
            if line.unit_cost < Decimal::ZERO {
                return Err(InventoryError::InvalidCost(format!(
                    "unit cost cannot be negative, got {}",
                    line.unit_cost
                ))
                .into());
            }
            // Priced off the rounded unit cost the lot will carry
            let line_net = Money::new(line.unit_cost).checked_times(line.quantity)?;
            net += line_net;
            if request.vatable {
                vat += rate.apply(&line_net);
            }
        }
        let total = net + vat;

        let source = LotSource::Purchase(request.purchase_id);
        let source_ref = source.to_string();

        let mut work = self.begin().await?;
        ensure_unrecorded(&mut work, &source_ref, None, Some(source)).await?;

        let mut lots = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let lot = receive(
                &mut work,
                ReceiveRequest::new(line.product_id, line.quantity, line.unit_cost, source),
            )
            .await?;
            shift_on_hand(&mut work, line.product_id, line.quantity).await?;
            lots.push(lot);
        }

        let accounts = self.accounts();
        let settlement = match request.payment {
            PaymentTerms::Cash => &accounts.cash,
            PaymentTerms::Credit => &accounts.accounts_payable,
        };
        let draft = EntryDraft::new(format!(
            "Purchase #{} - {} ({})",
            request.purchase_id.value(),
            request.supplier,
            request.payment
        ))
        .debit_nonzero(&accounts.inventory, net)
        .debit_nonzero(&accounts.vat_input, vat)
        .credit_nonzero(settlement, total)
        .with_source(&source_ref);

        // A delivery of free goods moves stock without any posting
        let entry = if total.is_zero() {
            None
        } else {
            Some(ledger::post(&mut work, draft).await?)
        };
        work.commit().await?;

        info!(net = %net, vat = %vat, total = %total, payment = %request.payment, "Purchase received");
        Ok(PostedPurchase {
            net,
            vat,
            total,
            lots,
            entry,
        })
    }
}
