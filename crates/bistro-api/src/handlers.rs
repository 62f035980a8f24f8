//! # Request Handlers
//!
//! Axum request handlers for the ordering API. Access control happens in the
//! extractors; handlers only see callers that already passed their guards.

use crate::error::ApiResult;
use crate::extract::{AdminOnly, Authenticated, SelfScoped};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use bistro_core::{
    AdminStats, BistroError, CartItem, CategoryStats, Claim, CommitReceipt, DeleteOutcome,
    InsertOutcome, MenuItem, NewCartItem, NewMenuItem, NewUser, Payment, PaymentFilter,
    PaymentSubmission, Review, Role, Store, StoreError, UpdateOutcome, UserAccount, UserHome,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Optional client header on `POST /create-payment-intent`, forwarded to the gateway
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Token request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminCheckResponse {
    pub admin: bool,
}

/// Registration result: either the insert, or a notice that the email exists
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Created(InsertOutcome),
    Exists { message: &'static str },
}

impl RegisterResponse {
    fn exists() -> Self {
        RegisterResponse::Exists {
            message: "user already exist!",
        }
    }
}

/// Create payment intent request
#[derive(Debug, Deserialize)]
pub struct IntentBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness check
pub async fn health() -> impl IntoResponse {
    "Boss is running"
}

/// Issue a bearer token
#[instrument(skip_all)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(BistroError::InvalidRequest("email is required".to_string()).into());
    }

    let claim = Claim {
        email: email.to_string(),
        name: request.name,
    };
    let token = state
        .tokens
        .issue(&claim)
        .map_err(|e| BistroError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse { token }))
}

// -- users --

#[instrument(skip_all)]
pub async fn list_users(
    _admin: AdminOnly,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserAccount>>> {
    Ok(Json(state.store.list_users().await?))
}

#[instrument(skip_all, fields(email = %scope.email))]
pub async fn user_home(
    scope: SelfScoped,
    State(state): State<AppState>,
) -> ApiResult<Json<UserHome>> {
    Ok(Json(state.stats.user_home(&scope.email).await?))
}

/// Whether `email` is an admin. Only answered for the caller's own email.
#[instrument(skip_all, fields(email = %email))]
pub async fn check_admin(
    Authenticated(caller): Authenticated,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<AdminCheckResponse>> {
    if !caller.owns(&email) {
        return Ok(Json(AdminCheckResponse { admin: false }));
    }

    let admin = state
        .store
        .find_user_by_email(&email)
        .await?
        .is_some_and(|account| account.role().is_admin());
    Ok(Json(AdminCheckResponse { admin }))
}

#[instrument(skip_all, fields(user_id = %id, by = %admin.email))]
pub async fn promote_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UpdateOutcome>> {
    let outcome = state.store.set_user_role(&id, Role::Admin).await?;
    if outcome.matched_count == 0 {
        return Err(BistroError::not_found("user", id).into());
    }

    info!("user promoted to admin");
    Ok(Json(outcome))
}

/// Register an account unless its email is already known
#[instrument(skip_all, fields(email = %user.email))]
pub async fn register_user(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> ApiResult<Json<RegisterResponse>> {
    if state.store.find_user_by_email(&user.email).await?.is_some() {
        return Ok(Json(RegisterResponse::exists()));
    }

    Ok(Json(insert_account(state.store.as_ref(), user.into_account()).await?))
}

/// Insert `account`. Losing a race to the same email answers like finding it.
async fn insert_account(store: &dyn Store, account: UserAccount) -> ApiResult<RegisterResponse> {
    match store.insert_user(account).await {
        Ok(outcome) => Ok(RegisterResponse::Created(outcome)),
        Err(StoreError::Conflict(reason)) => {
            info!(%reason, "registration lost to a concurrent insert");
            Ok(RegisterResponse::exists())
        }
        Err(e) => Err(e.into()),
    }
}

// -- menu & reviews --

pub async fn list_menu(State(state): State<AppState>) -> ApiResult<Json<Vec<MenuItem>>> {
    Ok(Json(state.store.list_menu().await?))
}

#[instrument(skip_all, fields(name = %item.name))]
pub async fn add_menu_item(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Json(item): Json<NewMenuItem>,
) -> ApiResult<Json<InsertOutcome>> {
    bistro_core::ensure_chargeable(item.price)?;
    Ok(Json(state.store.insert_menu_item(item.into_item()).await?))
}

#[instrument(skip_all, fields(id = %id))]
pub async fn delete_menu_item(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state.store.delete_menu_item(&id).await?;
    if outcome.deleted_count == 0 {
        return Err(BistroError::not_found("menu item", id).into());
    }
    Ok(Json(outcome))
}

pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.store.list_reviews().await?))
}

// -- carts --

/// Add a cart line. The catalog price wins when the dish is on the menu.
#[instrument(skip_all, fields(email = %item.email, menu_item = %item.menu_item_id))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    Json(item): Json<NewCartItem>,
) -> ApiResult<Json<InsertOutcome>> {
    let mut item = item.into_item();
    let menu = state
        .store
        .find_menu_items(std::slice::from_ref(&item.menu_item_id))
        .await?;
    if let Some(dish) = menu.first() {
        item.price_from(dish);
    }

    Ok(Json(state.store.insert_cart_item(item).await?))
}

#[instrument(skip_all, fields(email = %scope.email))]
pub async fn list_cart(
    scope: SelfScoped,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CartItem>>> {
    Ok(Json(state.store.list_cart(&scope.email).await?))
}

#[instrument(skip_all, fields(id = %id))]
pub async fn delete_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state.store.delete_cart_item(&id).await?;
    if outcome.deleted_count == 0 {
        return Err(BistroError::not_found("cart item", id).into());
    }
    Ok(Json(outcome))
}

// -- payments --

#[instrument(skip_all, fields(email = %caller.email))]
pub async fn create_payment_intent(
    Authenticated(caller): Authenticated,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IntentBody>,
) -> ApiResult<Json<IntentResponse>> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let intent = state
        .payments
        .create_intent(&caller, body.price, idempotency_key)
        .await?;
    Ok(Json(IntentResponse {
        client_secret: intent.client_secret,
    }))
}

#[instrument(skip_all, fields(email = %caller.email))]
pub async fn commit_payment(
    Authenticated(caller): Authenticated,
    State(state): State<AppState>,
    Json(submission): Json<PaymentSubmission>,
) -> ApiResult<Json<CommitReceipt>> {
    Ok(Json(state.payments.commit(&caller, submission).await?))
}

#[instrument(skip_all, fields(email = %scope.email))]
pub async fn payment_history(
    scope: SelfScoped,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Payment>>> {
    let payments = state
        .store
        .find_payments(&PaymentFilter::owner(&scope.email))
        .await?;
    Ok(Json(payments))
}

// -- stats --

#[instrument(skip_all)]
pub async fn admin_stats(
    _admin: AdminOnly,
    State(state): State<AppState>,
) -> ApiResult<Json<AdminStats>> {
    Ok(Json(state.stats.admin_stats().await?))
}

#[instrument(skip_all)]
pub async fn order_stats(
    _admin: AdminOnly,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryStats>>> {
    Ok(Json(state.stats.order_stats().await?))
}
