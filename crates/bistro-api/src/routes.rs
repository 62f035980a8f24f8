//! # Routes
//!
//! Axum router configuration for the ordering API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Public: `/`, `/health`, `POST /jwt`, `POST /users`, `GET /menu`,
///   `GET /reviews`, `POST /carts`, `DELETE /carts/{id}`
/// - Authenticated: `GET /users/admin/{email}`, `POST /create-payment-intent`,
///   `POST /payments`
/// - Self-scoped (`?email=`): `GET /user-home`, `GET /carts`, `GET /payment-history`
/// - Admin: `GET /users`, `PATCH /users/admin/{id}`, `POST /menu`,
///   `DELETE /menu/{id}`, `GET /admin-stats`, `GET /order-stats`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let user_routes = Router::new()
        .route("/users", get(handlers::list_users).post(handlers::register_user))
        // GET takes an email, PATCH an account id
        .route(
            "/users/admin/{user}",
            get(handlers::check_admin).patch(handlers::promote_user),
        )
        .route("/user-home", get(handlers::user_home));

    let catalog_routes = Router::new()
        .route("/menu", get(handlers::list_menu).post(handlers::add_menu_item))
        .route("/menu/{id}", delete(handlers::delete_menu_item))
        .route("/reviews", get(handlers::list_reviews));

    let cart_routes = Router::new()
        .route("/carts", get(handlers::list_cart).post(handlers::add_cart_item))
        .route("/carts/{id}", delete(handlers::delete_cart_item));

    let payment_routes = Router::new()
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/payments", post(handlers::commit_payment))
        .route("/payment-history", get(handlers::payment_history));

    let stats_routes = Router::new()
        .route("/admin-stats", get(handlers::admin_stats))
        .route("/order-stats", get(handlers::order_stats));

    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/jwt", post(handlers::issue_token))
        .merge(user_routes)
        .merge(catalog_routes)
        .merge(cart_routes)
        .merge(payment_routes)
        .merge(stats_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
