//! # Payment Workflow
//!
//! Turns a cart into a payment record.
//!
//! ```text
//!  create_intent ─► (client confirms charge) ─► commit
//!                                                 │
//!          insert payment (pending) ──────────────┤ fails: Storage, cart untouched
//!          delete owner's cart items ─────────────┤ fails: PartialFailure, payment stays pending
//!          mark payment recorded ─────────────────┘ fails: PartialFailure, payment stays pending
//!
//!  reconcile: for each pending payment, re-run delete + mark
//! ```
//!
//! The insert is refused when the owner already has a payment over any of
//! the same cart items, so a retried or concurrent commit never records a
//! cart twice. A retry with exactly the pending payment's items resumes it.
//!
//! A pending payment is the reconciliation marker: it is never counted by
//! the stats and is completed by [`PaymentWorkflow::reconcile`].

use crate::error::{BistroError, BistroResult};
use crate::gateway::{BoxedPaymentGateway, IntentRequest};
use crate::identity::Identity;
use crate::money::{ensure_chargeable, round_money, rounded_sum, Currency};
use crate::payment::{Payment, PaymentIntent, PaymentStatus, PaymentSubmission};
use crate::store::{DeleteOutcome, InsertOutcome, PaymentClaim, PaymentFilter, SharedStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Response of a completed commit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub insert_result: InsertOutcome,
    pub delete_result: DeleteOutcome,
    pub payment: Payment,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub examined: usize,
    pub recorded: usize,
    pub failed: usize,
}

/// Checkout orchestration over the store and the gateway
#[derive(Clone)]
pub struct PaymentWorkflow {
    store: SharedStore,
    gateway: BoxedPaymentGateway,
    currency: Currency,
}

impl PaymentWorkflow {
    pub fn new(store: SharedStore, gateway: BoxedPaymentGateway, currency: Currency) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Stage a charge for `price` with the gateway. A client-supplied
    /// `idempotency_key` is forwarded so a retried request stages one charge.
    #[instrument(skip(self, identity), fields(email = %identity.email, provider = self.gateway.provider_name()))]
    pub async fn create_intent(
        &self,
        identity: &Identity,
        price: Decimal,
        idempotency_key: Option<String>,
    ) -> BistroResult<PaymentIntent> {
        ensure_chargeable(price)?;
        let amount = self.currency.to_minor_units(price)?;
        if amount <= 0 {
            return Err(BistroError::InvalidPrice {
                message: format!("{price} rounds to zero {}", self.currency),
            });
        }

        let mut request = IntentRequest::card(amount, self.currency).with_email(&identity.email);
        if let Some(key) = idempotency_key {
            request = request.with_idempotency_key(key);
        }
        let intent = self.gateway.create_intent(&request).await?;

        info!(intent_id = %intent.id, amount, "created payment intent");
        Ok(intent)
    }

    /// Record a completed checkout and consume the referenced cart items.
    #[instrument(skip(self, identity, submission), fields(email = %identity.email, items = submission.cart_items.len()))]
    pub async fn commit(
        &self,
        identity: &Identity,
        mut submission: PaymentSubmission,
    ) -> BistroResult<CommitReceipt> {
        if !identity.owns(&submission.email) {
            return Err(BistroError::Forbidden("forbidden access!".to_string()));
        }
        if submission.cart_items.is_empty() {
            return Err(BistroError::InvalidRequest(
                "payment references no cart items".to_string(),
            ));
        }
        let unique: HashSet<&String> = submission.cart_items.iter().collect();
        if unique.len() != submission.cart_items.len() {
            return Err(BistroError::InvalidRequest(
                "payment references a cart item twice".to_string(),
            ));
        }
        ensure_chargeable(submission.price)?;

        // Every referenced item must still be in the owner's cart. This also
        // rejects a replay of an already-consumed cart.
        let cart = self.store.list_cart(&submission.email).await?;
        let mut referenced = Vec::with_capacity(submission.cart_items.len());
        for id in &submission.cart_items {
            let item = cart.iter().find(|c| &c.id == id).ok_or_else(|| {
                BistroError::InvalidRequest(format!("cart item {id} is not in the cart"))
            })?;
            referenced.push(item);
        }

        let expected = rounded_sum(referenced.iter().map(|c| c.price));
        if round_money(submission.price) != expected {
            return Err(BistroError::InvalidPrice {
                message: format!(
                    "submitted {} but cart totals {expected}",
                    submission.price
                ),
            });
        }

        submission.menu_items = referenced.iter().map(|c| c.menu_item_id.clone()).collect();
        if submission.item_names.is_empty() {
            submission.item_names = referenced.iter().filter_map(|c| c.name.clone()).collect();
        }

        let payment = submission.into_pending();
        match self.store.insert_payment(payment.clone()).await? {
            PaymentClaim::Inserted(insert_result) => self.complete(payment, insert_result).await,
            PaymentClaim::Claimed(existing) => self.resume(existing, &payment.cart_items).await,
        }
    }

    async fn complete(
        &self,
        mut payment: Payment,
        insert_result: InsertOutcome,
    ) -> BistroResult<CommitReceipt> {
        let delete_result = self.finish(&payment).await?;
        payment.status = PaymentStatus::Recorded;

        info!(payment_id = %payment.id, deleted = delete_result.deleted_count, "payment recorded");
        Ok(CommitReceipt {
            insert_result,
            delete_result,
            payment,
        })
    }

    /// A retry of an interrupted checkout finishes the pending payment it
    /// left behind. Any other overlap with an existing payment is refused.
    async fn resume(&self, existing: Payment, cart_items: &[String]) -> BistroResult<CommitReceipt> {
        let same_cart = existing.cart_items.len() == cart_items.len()
            && cart_items.iter().all(|id| existing.cart_items.contains(id));

        if existing.status != PaymentStatus::Pending {
            return Err(BistroError::InvalidRequest(format!(
                "cart items already paid by payment {}",
                existing.id
            )));
        }
        if !same_cart {
            return Err(BistroError::InvalidRequest(format!(
                "cart items are held by pending payment {}",
                existing.id
            )));
        }

        info!(payment_id = %existing.id, "resuming pending payment");
        let insert_result = InsertOutcome::new(&existing.id);
        self.complete(existing, insert_result).await
    }

    /// Complete every pending payment.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> BistroResult<ReconcileReport> {
        let pending = self.store.find_payments(&PaymentFilter::pending()).await?;
        let mut report = ReconcileReport {
            examined: pending.len(),
            ..ReconcileReport::default()
        };

        for payment in &pending {
            match self.finish(payment).await {
                Ok(_) => report.recorded += 1,
                Err(e) => {
                    warn!(payment_id = %payment.id, error = %e, "reconciliation failed");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(?report, "reconciliation pass complete");
        }
        Ok(report)
    }

    /// Run [`reconcile`](Self::reconcile) every `every` until the task is aborted.
    pub fn spawn_reconciler(
        self: Arc<Self>,
        every: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.reconcile().await {
                    warn!(error = %e, "reconciliation pass aborted");
                }
            }
        })
    }

    /// Delete the payment's cart items for its owner, then mark it recorded.
    /// Both steps are idempotent.
    async fn finish(&self, payment: &Payment) -> BistroResult<DeleteOutcome> {
        let partial = |e: BistroError| {
            error!(payment_id = %payment.id, error = %e, "checkout left payment pending");
            BistroError::PartialFailure {
                payment_id: payment.id.clone(),
                message: "checkout incomplete, the payment will be completed shortly".to_string(),
            }
        };

        let deleted = self
            .store
            .delete_cart_items(&payment.email, &payment.cart_items)
            .await
            .map_err(|e| partial(e.into()))?;

        let updated = self
            .store
            .set_payment_status(&payment.id, PaymentStatus::Recorded)
            .await
            .map_err(|e| partial(e.into()))?;
        if updated.matched_count == 0 {
            return Err(partial(BistroError::not_found("payment", &payment.id)));
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::store::{MemoryStore, Store};
    use crate::testkit::{FakeGateway, FlakyStore, StoreFault};

    const OWNER: &str = "alice@example.com";

    fn price(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    async fn cart_of_three(store: &dyn Store) {
        for (id, menu, cents) in [("c1", "m1", 1000), ("c2", "m2", 550), ("c3", "m3", 725)] {
            store
                .insert_cart_item(CartItem::new(OWNER, menu, price(cents)).with_id(id))
                .await
                .unwrap();
        }
    }

    fn workflow(store: SharedStore) -> PaymentWorkflow {
        PaymentWorkflow::new(store, Arc::new(FakeGateway::default()), Currency::USD)
    }

    fn submission(ids: &[&str], cents: i64) -> PaymentSubmission {
        PaymentSubmission::new(OWNER, price(cents), ids.iter().map(|s| s.to_string()).collect())
            .with_transaction_id("pi_test")
    }

    #[tokio::test]
    async fn test_commit_consumes_only_referenced_items() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;

        let receipt = workflow(store.clone())
            .commit(&Identity::new(OWNER), submission(&["c1", "c2"], 1550))
            .await
            .unwrap();

        assert_eq!(receipt.delete_result.deleted_count, 2);
        assert_eq!(receipt.payment.menu_items, vec!["m1", "m2"]);
        assert!(receipt.payment.is_recorded());

        let remaining = store.list_cart(OWNER).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "c3");

        let payments = store.find_payments(&PaymentFilter::owner(OWNER)).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].cart_items, vec!["c1", "c2"]);
        assert_eq!(payments[0].status, PaymentStatus::Recorded);
    }

    #[tokio::test]
    async fn test_replayed_commit_is_rejected() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;
        let flow = workflow(store.clone());
        let identity = Identity::new(OWNER);

        flow.commit(&identity, submission(&["c1"], 1000)).await.unwrap();
        let err = flow
            .commit(&identity, submission(&["c1"], 1000))
            .await
            .unwrap_err();

        assert!(matches!(err, BistroError::InvalidRequest(_)));
        assert_eq!(store.count_payments().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_for_someone_else_is_forbidden() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;

        let err = workflow(store.clone())
            .commit(&Identity::new("mallory@example.com"), submission(&["c1"], 1000))
            .await
            .unwrap_err();

        assert!(matches!(err, BistroError::Forbidden(_)));
        assert_eq!(store.list_cart(OWNER).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_price_must_match_cart() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;

        let err = workflow(store.clone())
            .commit(&Identity::new(OWNER), submission(&["c1", "c2"], 100))
            .await
            .unwrap_err();

        assert!(matches!(err, BistroError::InvalidPrice { .. }));
        assert_eq!(store.count_payments().await.unwrap(), 0);
        assert_eq!(store.list_cart(OWNER).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_commit_validation() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;
        let flow = workflow(store);
        let identity = Identity::new(OWNER);

        let empty = flow.commit(&identity, submission(&[], 1000)).await.unwrap_err();
        assert!(matches!(empty, BistroError::InvalidRequest(_)));

        let duplicate = flow
            .commit(&identity, submission(&["c1", "c1"], 2000))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, BistroError::InvalidRequest(_)));

        let unknown = flow
            .commit(&identity, submission(&["nope"], 1000))
            .await
            .unwrap_err();
        assert!(matches!(unknown, BistroError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_insert_failure_leaves_cart_untouched() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::InsertPayment);

        let err = workflow(flaky.clone())
            .commit(&Identity::new(OWNER), submission(&["c1", "c2"], 1550))
            .await
            .unwrap_err();

        assert!(matches!(err, BistroError::Storage(_)));
        assert_eq!(flaky.list_cart(OWNER).await.unwrap().len(), 3);
        assert_eq!(flaky.count_payments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_pending_marker_then_reconciles() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::DeleteCartItems);
        let flow = workflow(flaky.clone());

        let err = flow
            .commit(&Identity::new(OWNER), submission(&["c1", "c2"], 1550))
            .await
            .unwrap_err();

        let payment_id = match err {
            BistroError::PartialFailure { ref payment_id, .. } => payment_id.clone(),
            other => panic!("expected PartialFailure, got {other:?}"),
        };
        assert!(err.is_retryable());

        let pending = flaky.find_payments(&PaymentFilter::pending()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, payment_id);
        assert!(flaky.find_payments(&PaymentFilter::recorded()).await.unwrap().is_empty());
        assert_eq!(flaky.list_cart(OWNER).await.unwrap().len(), 3);

        // still failing: reconciliation reports, does not record
        let report = flow.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport { examined: 1, recorded: 0, failed: 1 });

        flaky.heal();
        let report = flow.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport { examined: 1, recorded: 1, failed: 0 });

        let remaining = flaky.list_cart(OWNER).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "c3");
        let recorded = flaky.find_payments(&PaymentFilter::recorded()).await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].id, payment_id);
    }

    #[tokio::test]
    async fn test_retry_after_partial_failure_records_once() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::DeleteCartItems);
        let flow = workflow(flaky.clone());
        let owner = Identity::new(OWNER);

        let err = flow.commit(&owner, submission(&["c1", "c2"], 1550)).await.unwrap_err();
        assert!(err.is_retryable());
        let BistroError::PartialFailure { payment_id, message } = err else {
            panic!("expected PartialFailure");
        };
        assert!(!message.contains("injected"), "{message}");

        flaky.heal();
        let receipt = flow.commit(&owner, submission(&["c1", "c2"], 1550)).await.unwrap();
        assert_eq!(receipt.payment.id, payment_id);
        assert_eq!(receipt.payment.status, PaymentStatus::Recorded);
        assert_eq!(receipt.delete_result.deleted_count, 2);

        let report = flow.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport::default());

        let recorded = flaky.find_payments(&PaymentFilter::recorded()).await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(flaky.count_payments().await.unwrap(), 1);
        assert_eq!(flaky.list_cart(OWNER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_commit_against_pending_is_refused() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::DeleteCartItems);
        let flow = workflow(flaky.clone());
        let owner = Identity::new(OWNER);

        flow.commit(&owner, submission(&["c1", "c2"], 1550)).await.unwrap_err();
        flaky.heal();

        let err = flow.commit(&owner, submission(&["c2", "c3"], 1275)).await.unwrap_err();
        assert!(matches!(err, BistroError::InvalidRequest(_)));
        assert_eq!(flaky.count_payments().await.unwrap(), 1);
        assert_eq!(flaky.list_cart(OWNER).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_commits_record_one_payment() {
        let store = MemoryStore::new().shared();
        cart_of_three(store.as_ref()).await;
        let flow = workflow(store.clone());
        let owner = Identity::new(OWNER);

        let (a, b) = tokio::join!(
            flow.commit(&owner, submission(&["c1", "c2"], 1550)),
            flow.commit(&owner, submission(&["c1", "c2"], 1550)),
        );

        assert!(a.is_ok() || b.is_ok());
        assert_eq!(store.count_payments().await.unwrap(), 1);
        assert_eq!(
            store.find_payments(&PaymentFilter::recorded()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_status_failure_is_partial() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::SetPaymentStatus);

        let err = workflow(flaky.clone())
            .commit(&Identity::new(OWNER), submission(&["c3"], 725))
            .await
            .unwrap_err();

        assert!(matches!(err, BistroError::PartialFailure { .. }));
        assert_eq!(flaky.find_payments(&PaymentFilter::pending()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_with_nothing_pending() {
        let flow = workflow(MemoryStore::new().shared());
        assert_eq!(flow.reconcile().await.unwrap(), ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_create_intent_converts_to_minor_units() {
        let gateway = Arc::new(FakeGateway::default());
        let flow = PaymentWorkflow::new(MemoryStore::new().shared(), gateway.clone(), Currency::USD);

        let intent = flow
            .create_intent(&Identity::new(OWNER), Decimal::new(10005, 3), Some("order-7".into()))
            .await
            .unwrap();

        assert_eq!(intent.amount, 1001);
        assert!(intent.client_secret.starts_with("pi_fake_"));
        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].customer_email.as_deref(), Some(OWNER));
        assert_eq!(requests[0].idempotency_key.as_deref(), Some("order-7"));
    }

    #[tokio::test]
    async fn test_create_intent_rejects_bad_prices() {
        let flow = workflow(MemoryStore::new().shared());
        let identity = Identity::new(OWNER);

        for bad in [Decimal::ZERO, Decimal::new(-1, 0), Decimal::new(1, 3)] {
            let err = flow.create_intent(&identity, bad, None).await.unwrap_err();
            assert!(matches!(err, BistroError::InvalidPrice { .. }), "{bad}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reconciler_completes_pending() {
        let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
        cart_of_three(flaky.as_ref()).await;
        flaky.inject(StoreFault::DeleteCartItems);
        let flow = Arc::new(workflow(flaky.clone()));

        flow.commit(&Identity::new(OWNER), submission(&["c1"], 1000))
            .await
            .unwrap_err();
        flaky.heal();

        let handle = flow.clone().spawn_reconciler(std::time::Duration::from_secs(30));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        handle.abort();

        assert!(flaky.find_payments(&PaymentFilter::pending()).await.unwrap().is_empty());
        assert_eq!(flaky.list_cart(OWNER).await.unwrap().len(), 2);
    }
}
