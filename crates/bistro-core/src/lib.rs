//! # bistro-core
//!
//! Core types, access guards and the payment workflow for the Bistro Boss
//! ordering API.
//!
//! This crate provides:
//! - `TokenService` for issuing and verifying signed bearer tokens
//! - `GuardChain` and its predicates for per-route access control
//! - `Store` trait and `MemoryStore` for the document collections
//! - `PaymentWorkflow` for intent creation, atomic checkout and reconciliation
//! - `StatsAggregator` for dashboard rollups
//! - `BistroError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use bistro_core::{Claim, GuardChain, RequestContext, TokenService};
//!
//! let tokens = TokenService::new(secret, chrono::Duration::hours(1));
//! let token = tokens.issue(&Claim::new("alice@example.com"))?;
//!
//! let mut ctx = RequestContext::from_authorization(Some(&format!("Bearer {token}")));
//! GuardChain::authenticated(tokens).run(&mut ctx).await?;
//! assert_eq!(ctx.identity()?.email, "alice@example.com");
//! ```

pub mod cart;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod identity;
pub mod money;
pub mod payment;
pub mod stats;
pub mod store;
pub mod token;
pub mod workflow;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// Re-exports for convenience
pub use cart::{CartItem, NewCartItem};
pub use catalog::{CatalogSeed, MenuItem, NewMenuItem, Review};
pub use error::{BistroError, BistroResult, StoreError, StoreResult};
pub use gateway::{BoxedPaymentGateway, IntentRequest, PaymentGateway};
pub use guard::{
    parse_bearer, AccessGuards, GuardChain, GuardPredicate, RequestContext, RequireBearer,
    RequireRole, RequireSelf,
};
pub use identity::{Identity, NewUser, Role, UserAccount};
pub use money::{ensure_chargeable, round_money, rounded_sum, Currency};
pub use payment::{Payment, PaymentIntent, PaymentStatus, PaymentSubmission};
pub use stats::{AdminStats, CategoryStats, StatsAggregator, UserHome};
pub use store::{
    new_document_id, DeleteOutcome, InsertOutcome, MemoryStore, PaymentClaim, PaymentFilter,
    SharedStore, Store, UpdateOutcome,
};
pub use token::{Claim, TokenError, TokenService, DEFAULT_TOKEN_TTL_SECS};
pub use workflow::{CommitReceipt, PaymentWorkflow, ReconcileReport};
