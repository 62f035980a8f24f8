//! # bistro-api
//!
//! HTTP API layer for bistro-boss-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Guard-chain extractors (`Authenticated`, `AdminOnly`, `SelfScoped`)
//! - REST endpoints for accounts, menu, carts, payments and stats
//!
//! ## Endpoints
//!
//! | Method | Path | Access |
//! |--------|------|--------|
//! | GET | `/`, `/health` | public |
//! | POST | `/jwt` | public |
//! | GET | `/users` | admin |
//! | POST | `/users` | public |
//! | GET | `/users/admin/{email}` | authenticated |
//! | PATCH | `/users/admin/{id}` | admin |
//! | GET | `/user-home` | self |
//! | GET, POST | `/menu` | public, admin |
//! | DELETE | `/menu/{id}` | admin |
//! | GET | `/reviews` | public |
//! | GET, POST | `/carts` | self, public |
//! | DELETE | `/carts/{id}` | public |
//! | POST | `/create-payment-intent` | authenticated |
//! | POST | `/payments` | authenticated |
//! | GET | `/payment-history` | self |
//! | GET | `/admin-stats`, `/order-stats` | admin |

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::{AppConfig, AppState, ConfigError};
