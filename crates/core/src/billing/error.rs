//! Billing error types.

use casebill_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::types::PaymentStatus;

/// Errors raised while recording payments and issuing invoices.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The referenced case does not exist.
    #[error("case not found: {0}")]
    CaseNotFound(Uuid),

    /// The referenced payment concept does not exist.
    #[error("payment concept not found: {0}")]
    ConceptNotFound(Uuid),

    /// The referenced payment does not exist.
    #[error("payment not found: {0}")]
    PaymentNotFound(Uuid),

    /// Amount is zero or negative.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// Status change not allowed by the payment state machine.
    #[error("cannot move payment from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: PaymentStatus,
        /// Requested status.
        to: PaymentStatus,
    },

    /// Payment already left `pending` and its fields are frozen.
    #[error("payment {0} is no longer editable")]
    PaymentNotEditable(Uuid),

    /// Invoices are only issued for completed payments.
    #[error("payment {0} is not completed")]
    PaymentNotCompleted(Uuid),

    /// Completion must go through the resolver so the invoice is written with it.
    #[error("payment {0} can only be completed together with its invoice")]
    CompletionRequiresInvoice(Uuid),

    /// Payment has an invoice and cannot be deleted.
    #[error("payment {0} already has an invoice")]
    PaymentHasInvoice(Uuid),

    /// Candidate invoice number collided with an existing one.
    #[error("invoice number already taken: {0}")]
    InvoiceNumberTaken(String),

    /// No free invoice number found within the attempt budget.
    #[error("no free invoice number after {0} attempts")]
    InvoiceNumberExhausted(u32),

    /// Storage failure.
    #[error("repository error: {0}")]
    Repository(String),
}

impl BillingError {
    /// Wraps a storage failure.
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::CaseNotFound(_)
            | BillingError::ConceptNotFound(_)
            | BillingError::PaymentNotFound(_) => Self::NotFound(err.to_string()),
            BillingError::InvalidAmount => Self::Validation(err.to_string()),
            BillingError::InvalidStatusTransition { .. }
            | BillingError::PaymentNotEditable(_)
            | BillingError::PaymentNotCompleted(_)
            | BillingError::CompletionRequiresInvoice(_) => Self::BusinessRule(err.to_string()),
            BillingError::PaymentHasInvoice(_) => Self::Conflict(err.to_string()),
            BillingError::InvoiceNumberTaken(_) | BillingError::InvoiceNumberExhausted(_) => {
                Self::Internal(err.to_string())
            }
            BillingError::Repository(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_app_error_status() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::from(BillingError::CaseNotFound(id)).status_code(), 404);
        assert_eq!(AppError::from(BillingError::InvalidAmount).status_code(), 400);
        assert_eq!(
            AppError::from(BillingError::PaymentNotEditable(id)).status_code(),
            422
        );
        assert_eq!(
            AppError::from(BillingError::CompletionRequiresInvoice(id)).status_code(),
            422
        );
        assert_eq!(
            AppError::from(BillingError::PaymentHasInvoice(id)).status_code(),
            409
        );
        assert_eq!(
            AppError::from(BillingError::InvoiceNumberExhausted(5)).status_code(),
            500
        );
        assert_eq!(
            AppError::from(BillingError::repository("boom")).status_code(),
            500
        );
    }
}
