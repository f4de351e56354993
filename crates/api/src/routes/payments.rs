//! Payment routes.
//!
//! Creation runs through the payment resolver, which attributes the payment
//! to the case's claimant and issues its invoice.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use casebill_core::billing::{
    Invoice, Payment, PaymentMethod, PaymentRequest, PaymentResolver, PaymentStatus,
    ResolvedPayment,
};
use casebill_db::repositories::{
    LedgerRepository, PaymentDetails, PaymentFilter, PaymentRepository, UpdatePaymentInput,
};
use casebill_shared::types::{PageRequest, PageResponse};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};

/// Creates the payment routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route(
            "/payments/{payment_id}",
            get(get_payment).patch(update_payment).delete(delete_payment),
        )
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query parameters for listing payments.
#[derive(Debug, Default, Deserialize)]
pub struct ListPaymentsQuery {
    /// Filter by status.
    pub status: Option<PaymentStatus>,
    /// Filter by method.
    pub method: Option<PaymentMethod>,
    /// Paid on or after this day (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Paid on or before this day (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Search by billed username or case title.
    pub q: Option<String>,
}

impl From<ListPaymentsQuery> for PaymentFilter {
    fn from(query: ListPaymentsQuery) -> Self {
        Self {
            status: query.status,
            method: query.method,
            from: query.from,
            to: query.to,
            q: query.q,
        }
    }
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    /// Case being paid.
    pub case_id: Uuid,
    /// Optional catalog concept.
    pub concept_id: Option<Uuid>,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Payment method; defaults to cash.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Processor reference for card payments.
    #[validate(length(max = 255))]
    pub external_transaction_id: Option<String>,
}

/// Request body for editing a payment.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaymentRequest {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New method.
    pub method: Option<PaymentMethod>,
    /// New concept; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub concept_id: Option<Option<Uuid>>,
    /// New processor reference; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub external_transaction_id: Option<Option<String>>,
    /// New status.
    pub status: Option<PaymentStatus>,
}

impl UpdatePaymentRequest {
    fn external_id_too_long(&self) -> bool {
        matches!(&self.external_transaction_id, Some(Some(id)) if id.chars().count() > 255)
    }
}

/// Invoice as returned by the API.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// Invoice ID.
    pub id: Uuid,
    /// Invoiced payment.
    pub payment_id: Uuid,
    /// Invoice number.
    pub invoice_number: String,
    /// Tax identity.
    pub tax_id: String,
    /// Legal name.
    pub legal_name: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Tax authority control code.
    pub control_code: Option<String>,
    /// Stored PDF path.
    pub pdf_path: Option<String>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            payment_id: invoice.payment_id,
            invoice_number: invoice.invoice_number,
            tax_id: invoice.tax_id,
            legal_name: invoice.legal_name,
            issued_at: invoice.issued_at,
            control_code: invoice.control_code,
            pdf_path: invoice.pdf_path,
        }
    }
}

/// Payment as returned by the API.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Payment ID.
    pub id: Uuid,
    /// Case being paid.
    pub case_id: Uuid,
    /// Case title, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_title: Option<String>,
    /// Billed user.
    pub billed_user_id: Uuid,
    /// Billed user's login, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billed_username: Option<String>,
    /// Catalog concept.
    pub concept_id: Option<Uuid>,
    /// Concept name, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept_name: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Method.
    pub method: PaymentMethod,
    /// Status.
    pub status: PaymentStatus,
    /// Timestamp.
    pub paid_at: DateTime<Utc>,
    /// Processor reference.
    pub external_transaction_id: Option<String>,
    /// Invoice, when issued.
    pub invoice: Option<InvoiceResponse>,
}

impl PaymentResponse {
    fn from_payment(payment: Payment, invoice: Option<Invoice>) -> Self {
        Self {
            id: payment.id,
            case_id: payment.case_id,
            case_title: None,
            billed_user_id: payment.billed_user_id,
            billed_username: None,
            concept_id: payment.concept_id,
            concept_name: None,
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            paid_at: payment.paid_at,
            external_transaction_id: payment.external_transaction_id,
            invoice: invoice.map(InvoiceResponse::from),
        }
    }
}

impl From<PaymentDetails> for PaymentResponse {
    fn from(details: PaymentDetails) -> Self {
        Self {
            case_title: Some(details.case_title),
            billed_username: Some(details.billed_username),
            concept_name: details.concept_name,
            ..Self::from_payment(details.payment, details.invoice)
        }
    }
}

impl From<ResolvedPayment> for PaymentResponse {
    fn from(resolved: ResolvedPayment) -> Self {
        Self::from_payment(resolved.payment, Some(resolved.invoice))
    }
}

/// GET `/payments` - List payments, newest first, optionally filtered.
async fn list_payments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListPaymentsQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<PaymentResponse>>> {
    if let (Some(from), Some(to)) = (query.from, query.to)
        && from > to
    {
        return Err(ApiError::validation("from must not be after to"));
    }

    let repo = PaymentRepository::new((*state.db).clone());
    let page = repo.list(&query.into(), &page).await?;
    Ok(Json(page.map(PaymentResponse::from)))
}

/// POST `/payments` - Record a payment and issue its invoice.
async fn create_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let resolver = PaymentResolver::new(Arc::new(LedgerRepository::new((*state.db).clone())));
    let resolved = resolver
        .record_payment(
            PaymentRequest {
                case_id: payload.case_id,
                concept_id: payload.concept_id,
                amount: payload.amount,
                method: payload.method,
                external_transaction_id: payload.external_transaction_id,
            },
            auth.user_id(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(resolved))))
}

/// GET `/payments/{payment_id}` - Get a payment with its invoice.
async fn get_payment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<Json<PaymentResponse>> {
    let repo = PaymentRepository::new((*state.db).clone());
    Ok(Json(repo.get(payment_id).await?.into()))
}

/// PATCH `/payments/{payment_id}` - Edit a pending payment or move its status.
///
/// Moving to `completed` runs the resolver after any field edits, so the
/// payment and its invoice are committed together.
async fn update_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    if payload.external_id_too_long() {
        return Err(ApiError::validation(
            "external_transaction_id must be at most 255 characters",
        ));
    }

    let completing = payload.status == Some(PaymentStatus::Completed);
    let repo = PaymentRepository::new((*state.db).clone());
    let mut details = repo
        .update(
            payment_id,
            UpdatePaymentInput {
                amount: payload.amount,
                method: payload.method,
                concept_id: payload.concept_id,
                external_transaction_id: payload.external_transaction_id,
                status: payload.status.filter(|_| !completing),
            },
        )
        .await?;

    if completing {
        let resolver =
            PaymentResolver::new(Arc::new(LedgerRepository::new((*state.db).clone())));
        resolver.complete_payment(payment_id).await?;
        details = repo.get(payment_id).await?;
    }

    tracing::info!(%payment_id, user_id = %auth.user_id(), "Payment edited");
    Ok(Json(details.into()))
}

/// DELETE `/payments/{payment_id}` - Delete a payment without invoice.
async fn delete_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = PaymentRepository::new((*state.db).clone());
    repo.delete(payment_id).await?;

    tracing::info!(%payment_id, user_id = %auth.user_id(), "Payment removed");
    Ok(StatusCode::NO_CONTENT)
}
