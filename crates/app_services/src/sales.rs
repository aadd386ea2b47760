//! Sales and AR invoices
//!
//! Both drain stock through the FIFO engine and post one entry:
//!
//! | Account            | Debit         | Credit        |
//! |--------------------|---------------|---------------|
//! | Cash / AR          | total due     |               |
//! | Discounts Allowed  | discount      |               |
//! | COGS               | FIFO cost     |               |
//! | Sales Revenue      |               | net + discount|
//! | VAT Payable        |               | VAT           |
//! | Inventory          |               | FIFO cost     |
//!
//! Zero amounts are left out.

use core_kernel::{ArInvoiceId, Money, SaleId, TransactionScope, UnitOfWorkFactory};
use domain_inventory::{Consumption, ConsumptionRef};
use domain_ledger::{ledger, EntryDraft};
use tracing::{info, instrument};

use crate::documents::{PostedSale, SaleLine, SaleRequest};
use crate::error::WorkflowError;
use crate::pricing::{price_sale, SaleTotals};
use crate::service::{ensure_unrecorded, shift_on_hand, PosService};
use crate::unit_of_work::Books;

impl<F> PosService<F>
where
    F: UnitOfWorkFactory,
    F::Work: Books,
{
    /// Records a cash sale
    ///
    /// # Errors
    ///
    /// Pricing and quantity errors are raised before anything is touched.
    /// A stock shortage on any line rolls the whole sale back.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let sale = service
    ///     .record_sale(SaleId::new(1), SaleRequest::new().line(product, 2, dec!(56.00)))
    ///     .await?;
    /// assert_eq!(sale.totals.vat, Money::new(dec!(12.00)));
    /// ```
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn record_sale(&self, sale_id: SaleId, request: SaleRequest) -> Result<PostedSale, WorkflowError> {
        let description = match request.memo.as_deref() {
            Some(memo) => format!("Sale #{} - {memo}", sale_id.value()),
            None => format!("Sale #{}", sale_id.value()),
        };
        let debit_account = self.accounts().cash.clone();
        self.post_outbound(ConsumptionRef::Sale(sale_id), &request, description, debit_account)
            .await
    }

    /// Bills goods on credit to a customer
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn bill_ar_invoice(
        &self,
        invoice_id: ArInvoiceId,
        request: SaleRequest,
    ) -> Result<PostedSale, WorkflowError> {
        let description = match request.memo.as_deref() {
            Some(customer) => format!("AR Invoice #{} - {customer}", invoice_id.value()),
            None => format!("AR Invoice #{}", invoice_id.value()),
        };
        let debit_account = self.accounts().accounts_receivable.clone();
        self.post_outbound(ConsumptionRef::ArInvoice(invoice_id), &request, description, debit_account)
            .await
    }

    async fn post_outbound(
        &self,
        reference: ConsumptionRef,
        request: &SaleRequest,
        description: String,
        debit_account: String,
    ) -> Result<PostedSale, WorkflowError> {
        let totals = price_sale(request, self.config().vat_rate())?;
        let source_ref = reference.to_string();

        let mut work = self.begin().await?;
        ensure_unrecorded(&mut work, &source_ref, Some(reference), None).await?;

        let consumptions = self.drain_lines(&mut work, &request.lines, reference).await?;
        let cost_of_goods: Money = consumptions.iter().map(|c| c.total_cost).sum();

        let draft = self.outbound_draft(description, debit_account, &totals, cost_of_goods);
        let entry = ledger::post(&mut work, draft.with_source(&source_ref)).await?;
        work.commit().await?;

        info!(
            source = %source_ref,
            entry_id = %entry.id,
            total = %totals.total,
            cogs = %cost_of_goods,
            "Outbound document posted"
        );
        Ok(PostedSale {
            totals,
            cost_of_goods,
            consumptions,
            entry,
        })
    }

    /// Consumes every line and takes the units off the cached on-hand
    async fn drain_lines(
        &self,
        work: &mut F::Work,
        lines: &[SaleLine],
        reference: ConsumptionRef,
    ) -> Result<Vec<Consumption>, WorkflowError> {
        let mut consumptions = Vec::with_capacity(lines.len());
        for line in lines {
            let consumption = self
                .engine()
                .consume(&mut *work, line.product_id, line.quantity, reference)
                .await?;
            shift_on_hand(&mut *work, line.product_id, -line.quantity).await?;
            consumptions.push(consumption);
        }
        Ok(consumptions)
    }

    fn outbound_draft(
        &self,
        description: String,
        debit_account: String,
        totals: &SaleTotals,
        cost_of_goods: Money,
    ) -> EntryDraft {
        let accounts = self.accounts();
        EntryDraft::new(description)
            .debit_nonzero(debit_account, totals.total)
            .debit_nonzero(&accounts.discounts_allowed, totals.discount)
            .debit_nonzero(&accounts.cost_of_goods_sold, cost_of_goods)
            .credit_nonzero(&accounts.sales_revenue, totals.revenue())
            .credit_nonzero(&accounts.vat_payable, totals.vat)
            .credit_nonzero(&accounts.inventory, cost_of_goods)
    }
}
