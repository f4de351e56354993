//! Shared fixtures for router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use casebill_core::gateway::{
    GatewayError, PaymentIntent, PaymentIntentGateway, PaymentIntentRequest,
};
use casebill_core::pdf::{InvoiceDocument, InvoiceRenderer, RenderError};
use casebill_shared::{GatewayConfig, JwtConfig, JwtService};

use crate::AppState;

/// Gateway double that records requests and replays a fixed outcome.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<PaymentIntentRequest>>,
    pub reject_with: Option<String>,
}

#[async_trait]
impl PaymentIntentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reject_with {
            Some(message) => Err(GatewayError::Rejected {
                status: 402,
                message: message.clone(),
            }),
            None => Ok(PaymentIntent {
                id: "pi_test_1".to_string(),
                client_secret: "pi_test_1_secret_abc".to_string(),
            }),
        }
    }
}

pub struct FakeRenderer;

impl InvoiceRenderer for FakeRenderer {
    fn render(&self, _document: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
        Ok(b"%PDF-1.3 fake".to_vec())
    }
}

/// State with a disconnected database; handlers that touch it fail.
pub fn test_state(gateway: Arc<FakeGateway>) -> AppState {
    AppState {
        db: Arc::new(DatabaseConnection::Disconnected),
        jwt_service: Arc::new(JwtService::new(JwtConfig {
            secret: "router-test-secret".to_string(),
            access_token_expiry_secs: 900,
        })),
        gateway,
        renderer: Arc::new(FakeRenderer),
        gateway_config: Arc::new(GatewayConfig {
            secret_key: "sk_test".to_string(),
            publishable_key: "pk_test".to_string(),
            ..GatewayConfig::default()
        }),
    }
}

pub fn bearer(state: &AppState, user_id: Uuid, is_staff: bool) -> String {
    let token = state
        .jwt_service
        .generate_access_token(user_id, "cajero", is_staff)
        .unwrap();
    format!("Bearer {token}")
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
