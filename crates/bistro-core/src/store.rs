//! # Document Store
//!
//! The `Store` trait is the seam to the document database. Each method is a
//! single-document (or single-collection) primitive and must be atomic on its
//! own; multi-step consistency is the caller's job (see [`crate::workflow`]).
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                Store (trait)                 │
//! │  users · menu · reviews · carts · payments   │
//! └──────────────────────────────────────────────┘
//!                        ▲
//!          ┌─────────────┴─────────────┐
//!  ┌───────┴───────┐           ┌───────┴───────┐
//!  │  MemoryStore  │           │ document db   │
//!  │ (dev / tests) │           │   (future)    │
//!  └───────────────┘           └───────────────┘
//! ```

use crate::cart::CartItem;
use crate::catalog::{CatalogSeed, MenuItem, Review};
use crate::error::{StoreError, StoreResult};
use crate::identity::{Role, UserAccount};
use crate::payment::{Payment, PaymentStatus};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Generate a new document id
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertOutcome {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Result of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
        }
    }
}

/// Result of a payment insert. An owner's cart item backs at most one
/// payment, so an insert that overlaps an existing payment is refused and
/// the existing one is returned instead.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentClaim {
    Inserted(InsertOutcome),
    Claimed(Payment),
}

/// Payment query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub email: Option<String>,
    pub status: Option<PaymentStatus>,
}

impl PaymentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owner(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            status: None,
        }
    }

    pub fn pending() -> Self {
        Self::all().with_status(PaymentStatus::Pending)
    }

    pub fn recorded() -> Self {
        Self::all().with_status(PaymentStatus::Recorded)
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.email.as_deref().map_or(true, |e| payment.email == e)
            && self.status.map_or(true, |s| payment.status == s)
    }
}

/// Document store operations used by the API.
#[async_trait]
pub trait Store: Send + Sync {
    // -- users --
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>>;
    /// Fails with `Conflict` when the email is already registered
    async fn insert_user(&self, user: UserAccount) -> StoreResult<InsertOutcome>;
    async fn set_user_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome>;
    async fn count_users(&self) -> StoreResult<u64>;

    // -- menu --
    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>>;
    async fn find_menu_items(&self, ids: &[String]) -> StoreResult<Vec<MenuItem>>;
    async fn insert_menu_item(&self, item: MenuItem) -> StoreResult<InsertOutcome>;
    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome>;
    async fn count_menu(&self) -> StoreResult<u64>;

    // -- reviews --
    async fn list_reviews(&self) -> StoreResult<Vec<Review>>;

    // -- carts --
    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<InsertOutcome>;
    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>>;
    async fn delete_cart_item(&self, id: &str) -> StoreResult<DeleteOutcome>;
    /// Delete `ids` that belong to `owner`; ids owned by anyone else are left alone
    async fn delete_cart_items(&self, owner: &str, ids: &[String]) -> StoreResult<DeleteOutcome>;

    // -- payments --
    /// Insert unless a payment by the same owner already references one of
    /// its cart items. Check and insert are one atomic step.
    async fn insert_payment(&self, payment: Payment) -> StoreResult<PaymentClaim>;
    async fn set_payment_status(&self, id: &str, status: PaymentStatus)
        -> StoreResult<UpdateOutcome>;
    async fn find_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<Payment>>;
    async fn count_payments(&self) -> StoreResult<u64>;
}

/// Shared store handle, constructed once at startup and injected everywhere
pub type SharedStore = Arc<dyn Store>;

/// In-process store. Each collection sits behind its own lock; every trait
/// method takes at most one lock, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserAccount>>,
    menu: RwLock<Vec<MenuItem>>,
    reviews: RwLock<Vec<Review>>,
    carts: RwLock<Vec<CartItem>>,
    payments: RwLock<Vec<Payment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with catalog content
    pub fn from_seed(seed: CatalogSeed) -> Self {
        Self {
            menu: RwLock::new(seed.menu),
            reviews: RwLock::new(seed.reviews),
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        Ok(self.users.read().await.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: UserAccount) -> StoreResult<InsertOutcome> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        let outcome = InsertOutcome::new(&user.id);
        users.push(user);
        Ok(outcome)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) if user.role == Some(role) => Ok(UpdateOutcome::new(1, 0)),
            Some(user) => {
                user.role = Some(role);
                Ok(UpdateOutcome::new(1, 1))
            }
            None => Ok(UpdateOutcome::new(0, 0)),
        }
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn list_menu(&self) -> StoreResult<Vec<MenuItem>> {
        Ok(self.menu.read().await.clone())
    }

    async fn find_menu_items(&self, ids: &[String]) -> StoreResult<Vec<MenuItem>> {
        Ok(self
            .menu
            .read()
            .await
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn insert_menu_item(&self, item: MenuItem) -> StoreResult<InsertOutcome> {
        let mut menu = self.menu.write().await;
        if menu.iter().any(|m| m.id == item.id) {
            return Err(StoreError::Conflict(format!("menu item {} exists", item.id)));
        }
        let outcome = InsertOutcome::new(&item.id);
        menu.push(item);
        Ok(outcome)
    }

    async fn delete_menu_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let mut menu = self.menu.write().await;
        let before = menu.len();
        menu.retain(|m| m.id != id);
        Ok(DeleteOutcome::new((before - menu.len()) as u64))
    }

    async fn count_menu(&self) -> StoreResult<u64> {
        Ok(self.menu.read().await.len() as u64)
    }

    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        Ok(self.reviews.read().await.clone())
    }

    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<InsertOutcome> {
        let mut carts = self.carts.write().await;
        if carts.iter().any(|c| c.id == item.id) {
            return Err(StoreError::Conflict(format!("cart item {} exists", item.id)));
        }
        let outcome = InsertOutcome::new(&item.id);
        carts.push(item);
        Ok(outcome)
    }

    async fn list_cart(&self, email: &str) -> StoreResult<Vec<CartItem>> {
        Ok(self
            .carts
            .read()
            .await
            .iter()
            .filter(|c| c.email == email)
            .cloned()
            .collect())
    }

    async fn delete_cart_item(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let mut carts = self.carts.write().await;
        let before = carts.len();
        carts.retain(|c| c.id != id);
        Ok(DeleteOutcome::new((before - carts.len()) as u64))
    }

    async fn delete_cart_items(&self, owner: &str, ids: &[String]) -> StoreResult<DeleteOutcome> {
        let mut carts = self.carts.write().await;
        let before = carts.len();
        carts.retain(|c| !(c.email == owner && ids.contains(&c.id)));
        Ok(DeleteOutcome::new((before - carts.len()) as u64))
    }

    async fn insert_payment(&self, payment: Payment) -> StoreResult<PaymentClaim> {
        let mut payments = self.payments.write().await;
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(StoreError::Conflict(format!("payment {} exists", payment.id)));
        }
        let claimed = payments.iter().find(|p| {
            p.email == payment.email && p.cart_items.iter().any(|id| payment.cart_items.contains(id))
        });
        if let Some(existing) = claimed {
            return Ok(PaymentClaim::Claimed(existing.clone()));
        }
        let outcome = InsertOutcome::new(&payment.id);
        payments.push(payment);
        Ok(PaymentClaim::Inserted(outcome))
    }

    async fn set_payment_status(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> StoreResult<UpdateOutcome> {
        let mut payments = self.payments.write().await;
        match payments.iter_mut().find(|p| p.id == id) {
            Some(payment) if payment.status == status => Ok(UpdateOutcome::new(1, 0)),
            Some(payment) => {
                payment.status = status;
                Ok(UpdateOutcome::new(1, 1))
            }
            None => Ok(UpdateOutcome::new(0, 0)),
        }
    }

    async fn find_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn count_payments(&self) -> StoreResult<u64> {
        Ok(self.payments.read().await.len() as u64)
    }
}
