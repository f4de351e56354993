//! Invoice routes (read-only).
//!
//! Invoices are only ever written by the payment resolver.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use casebill_db::InvoiceRepository;
use casebill_shared::{
    AppError,
    types::{PageRequest, PageResponse},
};

use super::payments::InvoiceResponse;
use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Creates the invoice routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/{invoice_id}", get(get_invoice))
}

/// Query parameters for listing invoices.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    /// Search by invoice number, tax id or legal name.
    pub q: Option<String>,
}

/// GET `/invoices` - List invoices, newest first, optionally searched.
async fn list_invoices(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<InvoiceResponse>>> {
    let repo = InvoiceRepository::new((*state.db).clone());
    let page = repo.list(query.q.as_deref(), &page).await?;
    Ok(Json(page.map(InvoiceResponse::from)))
}

/// GET `/invoices/{invoice_id}` - Get an invoice.
async fn get_invoice(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<InvoiceResponse>> {
    let repo = InvoiceRepository::new((*state.db).clone());
    let invoice = repo
        .find_by_id(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invoice not found: {invoice_id}")))?;
    Ok(Json(invoice.into()))
}
