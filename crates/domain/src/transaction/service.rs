//! Transaction usecases: placing orders, reading them back and moving them
//! through their lifecycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::{AddressId, Identity, ProductId, TransactionId};
use store::{Product, Store, Transaction, TransactionShipping, TransactionStatus};
use validator::Validate;

use crate::error::StoreResultExt;
use crate::public::{TransactionParts, TransactionPublic};
use crate::services::{NotificationData, NotificationRequest, Notifier};
use crate::{DomainError, RequestContext};

use super::{TransactionFilter, TransactionForm, UpdateTransactionForm};

/// How status changes are checked, whether a seller sets them or an invoice
/// payment cascades to the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any known status may be set from any status.
    #[default]
    Permissive,

    /// Only moves along the lifecycle graph of [`TransactionStatus`] are
    /// accepted.
    Strict,
}

impl TransitionPolicy {
    pub fn allows(&self, from: TransactionStatus, to: TransactionStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => from.can_transition_to(to),
        }
    }
}

/// Service for placing and managing transactions.
pub struct TransactionService<S: Store> {
    store: S,
    notifier: Arc<dyn Notifier>,
    policy: TransitionPolicy,
}

impl<S: Store> TransactionService<S> {
    /// Creates a new transaction service with the permissive policy.
    pub fn new(store: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            policy: TransitionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Places an order for a product on behalf of the buyer.
    ///
    /// The total price is fixed here from the product's current price and is
    /// never recomputed. The seller is notified on a best-effort basis.
    #[tracing::instrument(skip(self, ctx, form), fields(buyer_id = %actor.user_id()))]
    pub async fn create_transaction(
        &self,
        ctx: &RequestContext,
        actor: Identity,
        form: TransactionForm,
    ) -> Result<TransactionPublic, DomainError> {
        form.validate()?;

        let product = ctx
            .run(self.store.get_product(ProductId::new(form.product_id)))
            .await?
            .context("error fetching product")?;
        if actor.is(product.seller_id) {
            return Err(DomainError::BuyOwnProduct);
        }

        let address = ctx
            .run(self.store.get_user_address(AddressId::new(form.address_id)))
            .await?
            .context("error fetching address")?;
        if !actor.is(address.user_id) {
            return Err(DomainError::TransactionAddressNotOwned);
        }

        let total_price = product
            .price
            .checked_multiply(form.quantity)
            .ok_or_else(|| DomainError::Validation("total price is out of range".to_string()))?;

        let mut transaction = Transaction::placed(
            product.id,
            actor.user_id(),
            product.seller_id,
            address.id,
            form.quantity,
            form.notes,
            total_price,
        );
        ctx.run(self.store.create_transaction(&mut transaction))
            .await?
            .context("error creating transaction")?;

        metrics::counter!("transactions_created_total").increment(1);
        tracing::info!(transaction_id = %transaction.id, %total_price, "transaction placed");

        self.notify_seller(ctx, &product).await;

        self.project(ctx, transaction).await
    }

    /// Loads one transaction with everything it references.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_transaction(
        &self,
        ctx: &RequestContext,
        id: TransactionId,
    ) -> Result<TransactionPublic, DomainError> {
        let transaction = ctx
            .run(self.store.get_transaction(id))
            .await?
            .context("error fetching transaction")?;

        self.project(ctx, transaction).await
    }

    /// Lists the actor's transactions, newest first.
    ///
    /// Returns one page and the number of matching transactions overall.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %actor.user_id()))]
    pub async fn get_transactions(
        &self,
        ctx: &RequestContext,
        actor: Identity,
        filter: TransactionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<TransactionPublic>, u64), DomainError> {
        let query = filter.to_query(actor.user_id(), limit, offset);
        let (transactions, total) = ctx
            .run(self.store.list_transactions(&query))
            .await?
            .context("error listing transactions")?;

        let mut projected = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            projected.push(self.project(ctx, transaction).await?);
        }

        Ok((projected, total))
    }

    /// Moves a transaction to the requested status on behalf of its seller.
    ///
    /// `paid` and `finished` stamp their timestamp; `delivered` records the
    /// shipping details in the same unit of work as the status change.
    #[tracing::instrument(skip(self, ctx, form), fields(user_id = %actor.user_id(), status = %form.status))]
    pub async fn update_transaction(
        &self,
        ctx: &RequestContext,
        actor: Identity,
        id: TransactionId,
        form: UpdateTransactionForm,
    ) -> Result<(), DomainError> {
        let mut transaction = ctx
            .run(self.store.get_transaction(id))
            .await?
            .context("error fetching transaction")?;

        if !actor.is(transaction.seller_id) {
            return Err(DomainError::EditTransactionForbidden);
        }

        form.validate()?;

        let target: TransactionStatus = form
            .status
            .parse()
            .map_err(|_| DomainError::InvalidTransactionStateTransition)?;
        if !self.policy.allows(transaction.status, target) {
            tracing::debug!(from = %transaction.status, to = %target, "transition refused");
            return Err(DomainError::InvalidTransactionStateTransition);
        }

        let now = Utc::now();
        transaction.status = target;

        match target {
            TransactionStatus::Paid => transaction.paid_at = Some(now),
            TransactionStatus::Finished => transaction.finished_at = Some(now),
            TransactionStatus::Delivered => {
                let mut shipping =
                    TransactionShipping::new(transaction.id, form.awb_number, form.courier);
                ctx.run(self.store.ship_transaction(&mut shipping, &mut transaction))
                    .await?
                    .context("error creating shipping")?;

                metrics::counter!("transaction_state_updates_total", "status" => target.as_str())
                    .increment(1);
                return Ok(());
            }
            _ => {}
        }

        ctx.run(self.store.update_transaction_state(id, &mut transaction))
            .await?
            .context("error updating transaction")?;

        metrics::counter!("transaction_state_updates_total", "status" => target.as_str())
            .increment(1);
        Ok(())
    }

    /// Resolves every record a transaction references.
    ///
    /// Missing shipping is expected; any other failure aborts the read.
    async fn project(
        &self,
        ctx: &RequestContext,
        transaction: Transaction,
    ) -> Result<TransactionPublic, DomainError> {
        let started = Instant::now();

        let (buyer, buyer_address, product, seller, shipping) = tokio::try_join!(
            async {
                ctx.run(self.store.get_user(transaction.buyer_id))
                    .await
                    .and_then(|result| result.context("error fetching buyer"))
            },
            async {
                ctx.run(self.store.get_user_address(transaction.buyer_address_id))
                    .await
                    .and_then(|result| result.context("error fetching buyer address"))
            },
            async {
                ctx.run(self.store.get_product(transaction.product_id))
                    .await
                    .and_then(|result| result.context("error fetching product"))
            },
            async {
                ctx.run(self.store.get_user(transaction.seller_id))
                    .await
                    .and_then(|result| result.context("error fetching seller"))
            },
            async {
                match ctx
                    .run(self.store.get_shipping_by_transaction(transaction.id))
                    .await
                {
                    Ok(Ok(shipping)) => Ok(Some(shipping)),
                    Ok(Err(e)) if e.is_not_found() => Ok(None),
                    Ok(Err(e)) => Err(DomainError::store("error fetching shipping", e)),
                    Err(e) => Err(e),
                }
            },
        )?;

        let country = ctx
            .run(self.store.get_country(product.country_id))
            .await?
            .context("error fetching country")?;

        metrics::histogram!("transaction_projection_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(TransactionParts {
            transaction,
            product,
            country,
            seller,
            buyer,
            buyer_address,
            shipping,
        }
        .into())
    }

    /// Tells the seller about a new order if they registered a device.
    ///
    /// Never fails: lookup and publish problems are only logged.
    async fn notify_seller(&self, ctx: &RequestContext, product: &Product) {
        let device = match ctx.run(self.store.get_device_by_user(product.seller_id)).await {
            Ok(Ok(device)) => device,
            Ok(Err(e)) if e.is_not_found() => {
                tracing::debug!(seller_id = %product.seller_id, "seller has no registered device");
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "error fetching seller device");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "seller notification skipped");
                return;
            }
        };

        let seller = match ctx.run(self.store.get_user(product.seller_id)).await {
            Ok(Ok(seller)) => seller,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "error fetching seller for notification");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "seller notification skipped");
                return;
            }
        };

        let notification = NotificationRequest {
            device: device.device_token,
            user_id: seller.id,
            data: NotificationData {
                title: format!("Hi {}, ada transaksi baru!", seller.name),
                content: format!("Ada yang ingin membeli {} dari kamu.", product.title),
            },
        };

        if let Err(e) = ctx.run(self.notifier.publish(notification)).await {
            tracing::warn!(error = %e, "seller notification not published");
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::{FailPoint, InMemoryStore};

    use crate::services::InMemoryNotifier;

    use super::*;

    struct Fixture {
        service: TransactionService<InMemoryStore>,
        store: InMemoryStore,
        notifier: InMemoryNotifier,
        buyer: Identity,
        seller: Identity,
        product: Product,
        address: AddressId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let notifier = InMemoryNotifier::new();
        let buyer = store.seed_user("Budi").await;
        let seller = store.seed_user("Sari").await;
        let country = store.seed_country("Japan").await;
        let product = store
            .seed_product(seller.id, country.id, "Matcha", Money::new(5000))
            .await;
        let address = store.seed_address(buyer.id).await;

        Fixture {
            service: TransactionService::new(store.clone(), Arc::new(notifier.clone())),
            store,
            notifier,
            buyer: Identity::new(buyer.id).unwrap(),
            seller: Identity::new(seller.id).unwrap(),
            product,
            address: address.id,
        }
    }

    fn order(f: &Fixture, quantity: u32) -> TransactionForm {
        TransactionForm {
            product_id: f.product.id.as_i64(),
            quantity,
            address_id: f.address.as_i64(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_policy_defaults_to_permissive() {
        let f = fixture().await;
        assert_eq!(f.service.policy(), TransitionPolicy::Permissive);
        assert!(TransitionPolicy::Permissive
            .allows(TransactionStatus::Placed, TransactionStatus::Finished));
        assert!(!TransitionPolicy::Strict
            .allows(TransactionStatus::Placed, TransactionStatus::Finished));
    }

    #[tokio::test]
    async fn test_create_computes_total_price() {
        let f = fixture().await;
        let ctx = RequestContext::new();

        let public = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 2))
            .await
            .unwrap();

        assert_eq!(public.total_price, Money::new(10_000));
        assert_eq!(public.status, "placed");
        assert_eq!(public.buyer.id, f.buyer.user_id());
        assert_eq!(public.product.seller.id, f.seller.user_id());
        assert_eq!(public.product.country.name, "Japan");
        assert!(public.shipping.is_none());
    }

    #[tokio::test]
    async fn test_create_fails_without_product() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let mut form = order(&f, 1);
        form.product_id = 999;

        let err = f
            .service
            .create_transaction(&ctx, f.buyer, form)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(f.store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_overflow_is_rejected() {
        let f = fixture().await;
        let country = f.store.seed_country("Korea").await;
        let pricey = f
            .store
            .seed_product(f.seller.user_id(), country.id, "Gold", Money::new(i64::MAX))
            .await;
        let ctx = RequestContext::new();
        let mut form = order(&f, 2);
        form.product_id = pricey.id.as_i64();

        let err = f
            .service
            .create_transaction(&ctx, f.buyer, form)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_create() {
        let f = fixture().await;
        f.store.seed_device(f.seller.user_id(), "token-1").await;
        f.store.set_failure(FailPoint::GetDevice, true).await;
        let ctx = RequestContext::new();

        let result = f.service.create_transaction(&ctx, f.buyer, order(&f, 1)).await;

        assert!(result.is_ok());
        assert!(f.notifier.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_projection_aborts_on_lookup_failure() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let created = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 1))
            .await
            .unwrap();

        f.store.set_failure(FailPoint::GetShipping, true).await;
        let err = f.service.get_transaction(&ctx, created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Store { .. }));
        f.store.set_failure(FailPoint::GetShipping, false).await;

        f.store.set_failure(FailPoint::GetCountry, true).await;
        let err = f.service.get_transaction(&ctx, created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Store { .. }));
    }

    #[tokio::test]
    async fn test_update_stamps_finished_at() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let created = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 1))
            .await
            .unwrap();

        f.service
            .update_transaction(
                &ctx,
                f.seller,
                created.id,
                UpdateTransactionForm::status("finished"),
            )
            .await
            .unwrap();

        let stored = f.service.get_transaction(&ctx, created.id).await.unwrap();
        assert_eq!(stored.status, "finished");
        assert!(stored.finished_at.is_some());
        assert!(stored.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_update_accepts_any_case() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let created = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 1))
            .await
            .unwrap();

        f.service
            .update_transaction(
                &ctx,
                f.seller,
                created.id,
                UpdateTransactionForm::status("In_Progress"),
            )
            .await
            .unwrap();

        let stored = f.service.get_transaction(&ctx, created.id).await.unwrap();
        assert_eq!(stored.status, "in_progress");
    }

    #[tokio::test]
    async fn test_update_surfaces_write_failure() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let created = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 1))
            .await
            .unwrap();

        f.store
            .set_failure(FailPoint::UpdateTransactionState, true)
            .await;
        let err = f
            .service
            .update_transaction(&ctx, f.seller, created.id, UpdateTransactionForm::status("paid"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "internal_error");
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_before_any_write() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = f
            .service
            .create_transaction(&ctx, f.buyer, order(&f, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Cancelled));
        assert_eq!(f.store.transaction_count().await, 0);
    }
}
