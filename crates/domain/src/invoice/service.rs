use std::sync::Arc;

use chrono::Utc;
use common::{Identity, InvoiceId, TransactionId};
use store::{Invoice, InvoiceCode, InvoiceStatus, Store, StoreError, TransactionStatus};
use validator::Validate;

use crate::error::StoreResultExt;
use crate::public::InvoicePublic;
use crate::services::Storage;
use crate::{DomainError, RequestContext, TransitionPolicy, data_uri};

use super::{InvoiceCreateForm, InvoiceUpdateForm};

/// Directory receipt uploads are stored under.
pub const RECEIPT_PROOF_DIR: &str = "invoice_proofs";

/// Service for issuing invoices and recording their payment.
pub struct InvoiceService<S: Store> {
    store: S,
    storage: Arc<dyn Storage>,
    policy: TransitionPolicy,
}

impl<S: Store> InvoiceService<S> {
    pub fn new(store: S, storage: Arc<dyn Storage>) -> Self {
        Self {
            store,
            storage,
            policy: TransitionPolicy::default(),
        }
    }

    /// Policy applied when confirming payment moves the transaction to
    /// `paid`.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Issues the invoice for a transaction on behalf of its buyer.
    ///
    /// The invoice is stored and linked from the transaction in one unit of
    /// work; a transaction never gets a second invoice.
    #[tracing::instrument(skip(self, ctx, form), fields(user_id = %actor.user_id(), transaction_id = form.transaction_id))]
    pub async fn insert_invoice(
        &self,
        ctx: &RequestContext,
        actor: Identity,
        form: InvoiceCreateForm,
    ) -> Result<InvoicePublic, DomainError> {
        form.validate()?;

        let mut transaction = ctx
            .run(
                self.store
                    .get_transaction(TransactionId::new(form.transaction_id)),
            )
            .await?
            .context("error fetching transaction")?;

        if !actor.is(transaction.buyer_id) {
            return Err(DomainError::EditInvoiceForbidden);
        }

        match ctx
            .run(self.store.get_invoice_by_transaction(transaction.id))
            .await?
        {
            Ok(_) => return Err(DomainError::TransactionInvoiceExists),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(DomainError::store("error checking existing invoice", e)),
        }

        let mut invoice = Invoice::pending(
            transaction.id,
            InvoiceCode::generate(Utc::now().date_naive(), transaction.id),
            transaction.total_price,
            form.payment_method,
        );

        match ctx
            .run(self.store.attach_invoice(&mut invoice, &mut transaction))
            .await?
        {
            Ok(()) => {}
            // Lost a race with a concurrent insert for the same transaction
            Err(StoreError::Duplicate { .. }) => return Err(DomainError::TransactionInvoiceExists),
            Err(e) => return Err(DomainError::store("error creating invoice", e)),
        }

        metrics::counter!("invoices_created_total").increment(1);
        tracing::info!(invoice_id = %invoice.id, code = %invoice.invoice_code, "invoice issued");

        Ok(InvoicePublic::from(&invoice))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<InvoicePublic, DomainError> {
        let invoice = ctx
            .run(self.store.get_invoice(id))
            .await?
            .context("error fetching invoice")?;

        Ok(InvoicePublic::from(&invoice))
    }

    /// Attaches a receipt and/or confirms payment on behalf of the buyer.
    ///
    /// A receipt is stored and persisted on its own before the payment is
    /// confirmed. Confirming payment marks the invoice and its transaction
    /// paid with one shared timestamp, in one unit of work.
    #[tracing::instrument(skip(self, ctx, form), fields(user_id = %actor.user_id()))]
    pub async fn update_invoice(
        &self,
        ctx: &RequestContext,
        actor: Identity,
        id: InvoiceId,
        form: InvoiceUpdateForm,
    ) -> Result<InvoicePublic, DomainError> {
        let mut invoice = ctx
            .run(self.store.get_invoice(id))
            .await?
            .context("error fetching invoice")?;

        let mut transaction = ctx
            .run(self.store.get_transaction(invoice.transaction_id))
            .await?
            .context("error fetching transaction")?;

        if !actor.is(transaction.buyer_id) {
            return Err(DomainError::EditInvoiceForbidden);
        }

        // Exact literal: the general status table is not consulted here
        let settle = form.status.as_deref() == Some("paid");
        if settle
            && !self
                .policy
                .allows(transaction.status, TransactionStatus::Paid)
        {
            tracing::debug!(from = %transaction.status, "payment transition refused");
            return Err(DomainError::InvalidTransactionStateTransition);
        }

        if let Some(receipt) = form.receipt_proof.as_deref().filter(|r| !r.is_empty()) {
            let file = data_uri::decode(receipt)?;
            let path = format!(
                "{RECEIPT_PROOF_DIR}/{}{}",
                invoice.invoice_code, file.extension
            )
            .to_lowercase();

            let url = ctx
                .run(self.storage.store(&path, file.bytes))
                .await?
                .map_err(|source| DomainError::Storage {
                    context: "error storing receipt proof",
                    source,
                })?;

            invoice.receipt_proof = url;
            ctx.run(self.store.update_invoice(invoice.id, &mut invoice))
                .await?
                .context("error updating invoice")?;
            tracing::debug!(path = %path, "receipt proof stored");
        }

        if settle {
            let now = Utc::now();
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at = Some(now);
            transaction.status = TransactionStatus::Paid;
            transaction.paid_at = Some(now);

            ctx.run(self.store.settle_invoice(&mut invoice, &mut transaction))
                .await?
                .context("error confirming invoice payment")?;

            metrics::counter!("invoices_paid_total").increment(1);
            tracing::info!(invoice_id = %invoice.id, "invoice paid");
        }

        let refreshed = ctx
            .run(self.store.get_invoice(id))
            .await?
            .context("error fetching invoice")?;

        Ok(InvoicePublic::from(&refreshed))
    }
}
