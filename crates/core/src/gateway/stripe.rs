//! Stripe-compatible payment-intent client.

use std::time::Duration;

use async_trait::async_trait;
use casebill_shared::GatewayConfig;
use reqwest::Client;
use serde::Deserialize;

use super::{GatewayError, PaymentIntent, PaymentIntentGateway, PaymentIntentRequest};

/// Client for `POST {api_base_url}/payment_intents`.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

impl StripeGateway {
    /// Create a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Returns true when credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

#[async_trait]
impl PaymentIntentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }

        let url = format!(
            "{}/payment_intents",
            self.config.api_base_url.trim_end_matches('/')
        );
        let form = [
            ("amount", request.amount_minor.to_string()),
            ("currency", request.currency.clone()),
            ("metadata[user_id]", request.submitter_id.to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Payment intent response received");

        if status.is_success() {
            let intent: IntentResponse =
                serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
            let client_secret = intent
                .client_secret
                .ok_or_else(|| GatewayError::Decode("missing client_secret".to_string()))?;

            tracing::info!(
                intent_id = %intent.id,
                amount_minor = request.amount_minor,
                currency = %request.currency,
                "Payment intent created"
            );
            Ok(PaymentIntent {
                id: intent.id,
                client_secret,
            })
        } else {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message.or(e.error.code))
                .unwrap_or_else(|| format!("gateway returned HTTP {}", status.as_u16()));

            tracing::warn!(status = %status, %message, "Payment intent rejected");
            Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}
