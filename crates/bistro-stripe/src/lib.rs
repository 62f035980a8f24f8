//! # bistro-stripe
//!
//! Stripe payment-intent gateway for bistro-boss-rs.
//!
//! **StripeIntentGateway** implements `PaymentGateway` over the Payment
//! Intents API: it stages a card charge in minor units and returns the
//! client secret the browser uses to confirm it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bistro_stripe::StripeIntentGateway;
//! use bistro_core::{Currency, IntentRequest, PaymentGateway};
//!
//! // Create gateway from environment (PAYMENT_SECRET_KEY)
//! let gateway = StripeIntentGateway::from_env()?;
//!
//! let intent = gateway
//!     .create_intent(&IntentRequest::card(1250, Currency::USD))
//!     .await?;
//!
//! // Send intent.client_secret to the client
//! ```

pub mod config;
pub mod intent;

// Re-exports
pub use config::StripeConfig;
pub use intent::StripeIntentGateway;
