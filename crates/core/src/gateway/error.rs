//! Gateway error types.

use casebill_shared::AppError;
use thiserror::Error;

/// Errors from the payment-intent gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No secret key configured.
    #[error("payment gateway is not configured")]
    NotConfigured,

    /// Amount is non-positive or does not fit in minor units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Network or TLS failure.
    #[error("gateway request failed: {0}")]
    Transport(String),

    /// The provider answered with an error.
    #[error("{message}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider error message.
        message: String,
    },

    /// The provider's response could not be understood.
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAmount(_) => Self::Validation(err.to_string()),
            _ => Self::ExternalService(err.to_string()),
        }
    }
}
