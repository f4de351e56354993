//! Mapping of domain errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use casebill_core::billing::BillingError;
use casebill_core::gateway::GatewayError;
use casebill_core::pdf::RenderError;
use casebill_db::repositories::ConceptError;
use casebill_shared::AppError;
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Error returned by handlers; renders as `{"error", "message"}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 403 for non-staff submitters.
    #[must_use]
    pub fn staff_only() -> Self {
        Self(AppError::Forbidden("staff privileges required".to_string()))
    }

    /// 400 for malformed input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_server_error() {
            error!(error = %self.0, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err.into())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err.into())
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        Self(err.into())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<ConceptError> for ApiError {
    fn from(err: ConceptError) -> Self {
        match err {
            ConceptError::NotFound(_) => Self(AppError::NotFound(err.to_string())),
            ConceptError::InvalidName | ConceptError::NegativePrice => {
                Self(AppError::Validation(err.to_string()))
            }
            ConceptError::Database(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self(AppError::Validation(err.to_string()))
    }
}
