//! # Bistro Boss
//!
//! Restaurant ordering API server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export SECRET_ACCESS_TOKEN=...            # at least 16 bytes
//! export PAYMENT_SECRET_KEY=sk_test_...
//! export MENU_SEED_PATH=config/menu.toml    # optional
//!
//! # Run the server (LOG_FORMAT=json for structured logs)
//! bistro-boss
//! ```

use bistro_api::{routes, state::AppConfig, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;
    let interval = config.reconcile_interval();

    let state = AppState::new(config)?;

    info!("Environment: {}", state.config.environment);
    info!("Currency: {}", state.payments.currency());
    if !state.config.is_production() && !state.config.payment_secret_key.starts_with("sk_test_") {
        warn!("Live payment key configured outside production");
    }

    // Completes checkouts whose cart cleanup was interrupted
    let reconciler = state.payments.clone().spawn_reconciler(interval);

    let app = routes::create_router(state);

    info!("Bistro Boss listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reconciler.abort();
    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
