//! # Stripe Payment Intents
//!
//! Stages a card charge through the Payment Intents API and hands back the
//! client secret. The charge is confirmed by the client, not here.

use crate::config::StripeConfig;
use async_trait::async_trait;
use bistro_core::{BistroError, BistroResult, IntentRequest, PaymentGateway, PaymentIntent};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe payment-intent gateway
pub struct StripeIntentGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeIntentGateway {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> BistroResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BistroError::Configuration(format!("http client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> BistroResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    fn form_params(request: &IntentRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.as_str().to_string()),
        ];
        for (i, method) in request.payment_method_types.iter().enumerate() {
            params.push((format!("payment_method_types[{i}]"), method.clone()));
        }
        if let Some(ref email) = request.customer_email {
            params.push(("receipt_email".to_string(), email.clone()));
        }
        params
    }
}

#[async_trait]
impl PaymentGateway for StripeIntentGateway {
    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn create_intent(&self, request: &IntentRequest) -> BistroResult<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        debug!("Creating Stripe payment intent");

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&Self::form_params(request));
        if let Some(ref key) = request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BistroError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BistroError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(error_response) => error_response.error.message,
                Err(_) => format!("HTTP {status}"),
            };
            return Err(BistroError::Gateway {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            BistroError::Serialization(format!("Failed to parse Stripe response: {e}"))
        })?;

        info!(intent_id = %intent.id, "Created Stripe payment intent");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: request.amount,
            currency: request.currency,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
