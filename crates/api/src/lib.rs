//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - HTML finance pages and invoice PDF download under `/finance`
//! - Authentication middleware
//! - Error-to-response mapping

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use casebill_core::gateway::PaymentIntentGateway;
use casebill_core::pdf::InvoiceRenderer;
use casebill_shared::{GatewayConfig, JwtService};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Card payment-intent gateway.
    pub gateway: Arc<dyn PaymentIntentGateway>,
    /// Invoice PDF renderer.
    pub renderer: Arc<dyn InvoiceRenderer>,
    /// Gateway settings exposed to pages (publishable key, currency).
    pub gateway_config: Arc<GatewayConfig>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .nest("/finance", routes::finance_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
