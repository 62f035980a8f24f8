//! # Payment Types
//!
//! Payment ledger entries and the checkout submission that produces them.

use crate::store::new_document_id;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Written, but its cart items are not yet confirmed deleted
    #[default]
    Pending,
    /// Cart consumed; terminal
    Recorded,
}

/// An append-only payment ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owner
    pub email: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Gateway transaction reference reported by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Cart items consumed by this payment
    pub cart_items: Vec<String>,

    /// Menu items purchased (one entry per line item)
    pub menu_items: Vec<String>,

    #[serde(default)]
    pub item_names: Vec<String>,

    #[serde(default)]
    pub status: PaymentStatus,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_recorded(&self) -> bool {
        self.status == PaymentStatus::Recorded
    }

    /// Number of purchased line items
    pub fn line_count(&self) -> usize {
        self.menu_items.len()
    }
}

/// Body of `POST /payments`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    pub email: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    #[serde(default)]
    pub transaction_id: Option<String>,

    pub cart_items: Vec<String>,

    #[serde(default)]
    pub menu_items: Vec<String>,

    #[serde(default)]
    pub item_names: Vec<String>,
}

impl PaymentSubmission {
    pub fn new(email: impl Into<String>, price: Decimal, cart_items: Vec<String>) -> Self {
        Self {
            email: email.into(),
            price,
            transaction_id: None,
            cart_items,
            menu_items: Vec::new(),
            item_names: Vec::new(),
        }
    }

    /// Builder: set purchased menu item ids
    pub fn with_menu_items(mut self, menu_items: Vec<String>) -> Self {
        self.menu_items = menu_items;
        self
    }

    /// Builder: set gateway transaction id
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Build the pending ledger entry for this submission
    pub fn into_pending(self) -> Payment {
        Payment {
            id: new_document_id(),
            email: self.email,
            price: self.price,
            transaction_id: self.transaction_id,
            cart_items: self.cart_items,
            menu_items: self.menu_items,
            item_names: self.item_names,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Client-usable result of the pricing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent id
    pub id: String,
    /// Secret the client uses to confirm the charge
    pub client_secret: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: crate::money::Currency,
}
