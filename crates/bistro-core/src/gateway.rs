//! # Payment Gateway Trait
//!
//! Seam to the external payment-intent provider. The gateway stages an
//! amount and returns a client secret; the charge itself is confirmed
//! client-side, so creating an intent never changes this system's state.
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │        PaymentGateway (trait)         │
//! │  ├── create_intent()                  │
//! │  └── provider_name()                  │
//! └───────────────────────────────────────┘
//!                    ▲
//!          ┌─────────┴─────────┐
//!  ┌───────┴───────┐   ┌───────┴───────┐
//!  │ StripeIntent  │   │  FakeGateway  │
//!  │   Gateway     │   │   (testkit)   │
//!  └───────────────┘   └───────────────┘
//! ```

use crate::error::BistroResult;
use crate::money::Currency;
use crate::payment::PaymentIntent;
use async_trait::async_trait;
use std::sync::Arc;

/// Parameters for staging a charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    pub payment_method_types: Vec<String>,
    /// Receipt email, if known
    pub customer_email: Option<String>,
    pub idempotency_key: Option<String>,
}

impl IntentRequest {
    /// Card-only intent
    pub fn card(amount: i64, currency: Currency) -> Self {
        Self {
            amount,
            currency,
            payment_method_types: vec!["card".to_string()],
            customer_email: None,
            idempotency_key: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Payment-intent provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Stage a charge and return its client secret.
    async fn create_intent(&self, request: &IntentRequest) -> BistroResult<PaymentIntent>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
