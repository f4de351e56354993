//! Card payment-intent endpoint.
//!
//! Replies use a flat `{"error": "..."}` body because the browser checkout
//! script reads that field directly.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use casebill_core::gateway::{PaymentIntentRequest, to_minor_units};

use crate::{AppState, middleware::AuthUser};

/// Creates the payment-intent routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/payment-intents",
        post(create_payment_intent).fallback(method_not_allowed),
    )
}

/// Request body for creating a payment intent.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in currency units.
    #[serde(alias = "monto")]
    pub amount: Decimal,
}

/// Successful reply.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    /// Secret the browser uses to confirm the card payment.
    pub client_secret: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// POST `/payment-intents` - Ask the gateway for a payment intent.
async fn create_payment_intent(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_reply(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let amount_minor = match to_minor_units(payload.amount) {
        Ok(minor) => minor,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let request = PaymentIntentRequest {
        amount_minor,
        currency: state.gateway_config.currency.clone(),
        submitter_id: auth.user_id(),
    };

    match state.gateway.create_payment_intent(&request).await {
        Ok(intent) => {
            info!(
                intent_id = %intent.id,
                user_id = %auth.user_id(),
                amount_minor,
                "Payment intent created"
            );
            Json(PaymentIntentResponse {
                client_secret: intent.client_secret,
            })
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, user_id = %auth.user_id(), "Payment intent failed");
            error_reply(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn method_not_allowed() -> Response {
    error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
