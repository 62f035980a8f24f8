//! # Application State
//!
//! Shared state for the Axum application: the store handle, token service,
//! access guards, payment workflow and configuration. Built once at startup
//! and cloned into every handler.

use bistro_core::{
    AccessGuards, BoxedPaymentGateway, CatalogSeed, Currency, MemoryStore, PaymentWorkflow,
    SharedStore, StatsAggregator, TokenService, DEFAULT_TOKEN_TTL_SECS,
};
use bistro_stripe::{StripeConfig, StripeIntentGateway};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 16;

/// Invalid or missing settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Bearer token signing secret
    pub token_secret: String,
    pub token_ttl_secs: i64,
    /// Gateway secret key (sk_test_... or sk_live_...)
    pub payment_secret_key: String,
    pub currency: Currency,
    /// Seconds between reconciliation passes
    pub reconcile_interval_secs: u64,
    /// Optional TOML file with menu and reviews
    pub menu_seed_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret =
            lookup("SECRET_ACCESS_TOKEN").ok_or(ConfigError::Missing("SECRET_ACCESS_TOKEN"))?;
        if token_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SECRET_ACCESS_TOKEN",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let token_ttl_secs = parse_or(&lookup, "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        let payment_secret_key =
            lookup("PAYMENT_SECRET_KEY").ok_or(ConfigError::Missing("PAYMENT_SECRET_KEY"))?;

        let currency = match lookup("PAYMENT_CURRENCY") {
            Some(code) => code.parse::<Currency>().map_err(|e| {
                ConfigError::Invalid {
                    name: "PAYMENT_CURRENCY",
                    reason: e.to_string(),
                }
            })?,
            None => Currency::default(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 5000)?,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            token_secret,
            token_ttl_secs,
            payment_secret_key,
            currency,
            reconcile_interval_secs: parse_or(&lookup, "RECONCILE_INTERVAL_SECS", 60)?,
            menu_seed_path: lookup("MENU_SEED_PATH").map(PathBuf::from),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "HOST",
                reason: e.to_string(),
            })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("currency", &self.currency)
            .field("reconcile_interval_secs", &self.reconcile_interval_secs)
            .field("menu_seed_path", &self.menu_seed_path)
            .finish_non_exhaustive()
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store handle
    pub store: SharedStore,
    /// Token issuing for `/jwt`
    pub tokens: TokenService,
    /// Access policies
    pub guards: AccessGuards,
    /// Checkout orchestration
    pub payments: Arc<PaymentWorkflow>,
    /// Dashboard rollups
    pub stats: StatsAggregator,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the in-memory store and the Stripe gateway
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let seed = load_catalog_seed(&config)?;
        let store = MemoryStore::from_seed(seed).shared();

        let stripe = StripeConfig::new(&config.payment_secret_key)
            .and_then(StripeIntentGateway::new)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::with_parts(config, store, Arc::new(stripe)))
    }

    /// Assemble state from already-built collaborators
    pub fn with_parts(config: AppConfig, store: SharedStore, gateway: BoxedPaymentGateway) -> Self {
        let tokens = TokenService::new(&config.token_secret, config.token_ttl());
        let guards = AccessGuards::new(tokens.clone(), store.clone());
        let payments = Arc::new(PaymentWorkflow::new(
            store.clone(),
            gateway,
            config.currency,
        ));
        let stats = StatsAggregator::new(store.clone());

        Self {
            store,
            tokens,
            guards,
            payments,
            stats,
            config,
        }
    }
}

/// Load menu and reviews from `MENU_SEED_PATH`, if configured
fn load_catalog_seed(config: &AppConfig) -> anyhow::Result<CatalogSeed> {
    let Some(path) = config.menu_seed_path.as_ref() else {
        tracing::info!("No menu seed configured, starting with an empty catalog");
        return Ok(CatalogSeed::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let seed = CatalogSeed::from_toml(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    tracing::info!(
        "Loaded {} menu items and {} reviews from {}",
        seed.menu.len(),
        seed.reviews.len(),
        path.display()
    );
    Ok(seed)
}
