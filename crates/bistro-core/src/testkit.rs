//! # Test Kit
//!
//! In-process doubles for the two external collaborators: a gateway that
//! never leaves the process and a store wrapper that fails on demand.
//! Compiled for this crate's tests and for dependents that enable the
//! `testkit` feature.

use crate::cart::CartItem;
use crate::catalog::{MenuItem, Review};
use crate::error::{BistroError, BistroResult, StoreError, StoreResult};
use crate::gateway::{IntentRequest, PaymentGateway};
use crate::identity::{Role, UserAccount};
use crate::payment::{Payment, PaymentIntent, PaymentStatus};
use crate::store::{
    DeleteOutcome, InsertOutcome, MemoryStore, PaymentClaim, PaymentFilter, Store, UpdateOutcome,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Gateway that records requests and returns deterministic secrets
#[derive(Debug, Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<IntentRequest>>,
    failing: AtomicBool,
}

impl FakeGateway {
    /// Make subsequent calls fail with a gateway error
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<IntentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: &IntentRequest) -> BistroResult<PaymentIntent> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BistroError::Gateway {
                provider: self.provider_name().to_string(),
                message: "card network unavailable".to_string(),
            });
        }

        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        requests.push(request.clone());
        let n = requests.len();

        Ok(PaymentIntent {
            id: format!("pi_fake_{n}"),
            client_secret: format!("pi_fake_{n}_secret_test"),
            amount: request.amount,
            currency: request.currency,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFault {
    FindUser,
    InsertPayment,
    DeleteCartItems,
    SetPaymentStatus,
}

/// [`MemoryStore`] wrapper with injectable faults
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Mutex<HashSet<StoreFault>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub fn inject(&self, fault: StoreFault) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(fault);
    }

    /// Clear every injected fault
    pub fn heal(&self) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn trip(&self, fault: StoreFault) -> StoreResult<()> {
        let faults = self
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if faults.contains(&fault) {
            return Err(StoreError::Unavailable(format!("injected fault {fault:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        self.inner.list_users().await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        self.trip(StoreFault::FindUser)?;
        self.inner.find_user_by_email(email).await
    }

    async fn insert_user(&self, user: UserAccount) -> StoreResult<InsertOutcome> {
        self.inner.insert_user(user).await
    }

    async fn set_user_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome> {
        self.inner.set_user_role(id, role).await
    }

    async fn count_users(&self) -> StoreResult<u64> {
        self.inner.count_users().await
    }

    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>> {
        self.inner.list_menu().await
    }

    async fn find_menu_items(&self, ids: &[String]) -> StoreResult<Vec<MenuItem>> {
        self.inner.find_menu_items(ids).await
    }

    async fn insert_menu_item(&self, item: MenuItem) -> StoreResult<InsertOutcome> {
        self.inner.insert_menu_item(item).await
    }

    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        self.inner.delete_menu_item(id).await
    }

    async fn count_menu(&self) -> StoreResult<u64> {
        self.inner.count_menu().await
    }

    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        self.inner.list_reviews().await
    }

    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<InsertOutcome> {
        self.inner.insert_cart_item(item).await
    }

    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>> {
        self.inner.list_cart(email).await
    }

    async fn delete_cart_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        self.inner.delete_cart_item(id).await
    }

    async fn delete_cart_items(&self, owner: &str, ids: &[String]) -> StoreResult<DeleteOutcome> {
        self.trip(StoreFault::DeleteCartItems)?;
        self.inner.delete_cart_items(owner, ids).await
    }

    async fn insert_payment(&self, payment: Payment) -> StoreResult<PaymentClaim> {
        self.trip(StoreFault::InsertPayment)?;
        self.inner.insert_payment(payment).await
    }

    async fn set_payment_status(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> StoreResult<UpdateOutcome> {
        self.trip(StoreFault::SetPaymentStatus)?;
        self.inner.set_payment_status(id, status).await
    }

    async fn find_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<Payment>> {
        self.inner.find_payments(filter).await
    }

    async fn count_payments(&self) -> StoreResult<u64> {
        self.inner.count_payments().await
    }
}
