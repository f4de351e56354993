//! Casebill API Server
//!
//! Main entry point for the case-management finance service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casebill_api::{AppState, create_router};
use casebill_core::gateway::StripeGateway;
use casebill_core::pdf::A4InvoiceRenderer;
use casebill_db::connect;
use casebill_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casebill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let jwt_service = JwtService::new(config.jwt.clone());

    let gateway = StripeGateway::new(config.gateway.clone())
        .context("failed to build payment gateway client")?;
    if gateway.is_configured() {
        info!(
            api_base_url = %config.gateway.api_base_url,
            currency = %config.gateway.currency,
            "Payment gateway configured"
        );
    } else {
        warn!("Payment gateway secret key not set; card payments are disabled");
    }

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        gateway: Arc::new(gateway),
        renderer: Arc::new(A4InvoiceRenderer),
        gateway_config: Arc::new(config.gateway),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
