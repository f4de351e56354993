//! Server-rendered finance screens and the invoice PDF download.

use askama::Template;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use uuid::Uuid;

use casebill_core::pdf::{InvoiceDocument, attachment_filename};
use casebill_db::repositories::{
    ConceptRepository, DirectoryRepository, PaymentDetails, PaymentRepository,
};
use casebill_shared::AppError;

use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Creates the finance page routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page))
        .route("/history", get(history_page))
        .route("/concepts", get(concepts_page))
        .route("/payments/{payment_id}/invoice.pdf", get(invoice_pdf))
}

/// Option in the concept selector.
struct ConceptOption {
    id: String,
    name: String,
    suggested_price: String,
}

/// Option in the case selector.
struct CaseOption {
    id: String,
    title: String,
}

#[derive(Template)]
#[template(path = "finance/register.html")]
struct RegisterTemplate {
    username: String,
    concepts: Vec<ConceptOption>,
    cases: Vec<CaseOption>,
    publishable_key: String,
    currency: String,
    card_enabled: bool,
}

/// Row of the payment history table.
struct HistoryRow {
    id: String,
    paid_at: String,
    case_title: String,
    billed_username: String,
    concept_name: String,
    amount: String,
    method: &'static str,
    status: &'static str,
    invoice_number: Option<String>,
}

impl From<PaymentDetails> for HistoryRow {
    fn from(details: PaymentDetails) -> Self {
        let payment = details.payment;
        Self {
            id: payment.id.to_string(),
            paid_at: payment.paid_at.format("%d/%m/%Y %H:%M").to_string(),
            case_title: details.case_title,
            billed_username: details.billed_username,
            concept_name: details.concept_name.unwrap_or_else(|| "-".to_string()),
            amount: format!("{:.2}", payment.amount),
            method: payment.method.label(),
            status: payment.status.as_str(),
            invoice_number: details.invoice.map(|i| i.invoice_number),
        }
    }
}

#[derive(Template)]
#[template(path = "finance/history.html")]
struct HistoryTemplate {
    username: String,
    rows: Vec<HistoryRow>,
}

/// Row of the concept catalog table.
struct ConceptRow {
    id: String,
    name: String,
    suggested_price: String,
    is_active: bool,
}

#[derive(Template)]
#[template(path = "finance/concepts.html")]
struct ConceptsTemplate {
    username: String,
    is_staff: bool,
    concepts: Vec<ConceptRow>,
}

fn render_page<T: Template>(template: &T) -> ApiResult<Html<String>> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")).into())
}

/// GET `/finance/register` - Manual payment registration form.
async fn register_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Html<String>> {
    let concepts = ConceptRepository::new((*state.db).clone())
        .list(false)
        .await?
        .into_iter()
        .map(|c| ConceptOption {
            id: c.id.to_string(),
            name: c.name,
            suggested_price: format!("{:.2}", c.suggested_price),
        })
        .collect();

    let cases = DirectoryRepository::new((*state.db).clone())
        .list_payable_cases()
        .await?
        .into_iter()
        .map(|c| CaseOption {
            id: c.id.to_string(),
            title: c.title,
        })
        .collect();

    render_page(&RegisterTemplate {
        username: auth.username().to_string(),
        concepts,
        cases,
        publishable_key: state.gateway_config.publishable_key.clone(),
        currency: state.gateway_config.currency.to_uppercase(),
        card_enabled: state.gateway_config.is_configured(),
    })
}

/// GET `/finance/history` - All payments with their invoices, newest first.
async fn history_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Html<String>> {
    let rows = PaymentRepository::new((*state.db).clone())
        .history()
        .await?
        .into_iter()
        .map(HistoryRow::from)
        .collect();

    render_page(&HistoryTemplate {
        username: auth.username().to_string(),
        rows,
    })
}

/// GET `/finance/concepts` - Concept catalog, active first.
async fn concepts_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Html<String>> {
    let concepts = ConceptRepository::new((*state.db).clone())
        .list(true)
        .await?
        .into_iter()
        .map(|c| ConceptRow {
            id: c.id.to_string(),
            name: c.name,
            suggested_price: format!("{:.2}", c.suggested_price),
            is_active: c.is_active,
        })
        .collect();

    render_page(&ConceptsTemplate {
        username: auth.username().to_string(),
        is_staff: auth.is_staff(),
        concepts,
    })
}

/// Builds the printable document for a payment that has an invoice.
fn invoice_document(details: PaymentDetails, currency: &str) -> Option<InvoiceDocument> {
    let invoice = details.invoice?;
    let payment = details.payment;
    Some(InvoiceDocument {
        invoice_number: invoice.invoice_number,
        issued_at: invoice.issued_at,
        tax_id: invoice.tax_id,
        legal_name: invoice.legal_name,
        control_code: invoice.control_code,
        case_title: details.case_title,
        concept_name: details.concept_name,
        amount: payment.amount,
        method_label: payment.method.label().to_string(),
        paid_at: payment.paid_at,
        currency: currency.to_uppercase(),
    })
}

/// GET `/finance/payments/{payment_id}/invoice.pdf` - Download the invoice.
async fn invoice_pdf(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<Response> {
    let details = PaymentRepository::new((*state.db).clone())
        .get(payment_id)
        .await?;

    let document = invoice_document(details, &state.gateway_config.currency).ok_or_else(|| {
        AppError::NotFound(format!("payment {payment_id} has no invoice"))
    })?;

    let bytes = state.renderer.render(&document)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_filename(&document.invoice_number)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("invalid content disposition: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebill_core::billing::{Invoice, Payment, PaymentMethod, PaymentStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn details(with_invoice: bool) -> PaymentDetails {
        let payment_id = Uuid::new_v4();
        let paid_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        PaymentDetails {
            payment: Payment {
                id: payment_id,
                case_id: Uuid::new_v4(),
                billed_user_id: Uuid::new_v4(),
                concept_id: None,
                amount: dec!(150),
                method: PaymentMethod::Qr,
                status: PaymentStatus::Completed,
                paid_at,
                external_transaction_id: None,
            },
            invoice: with_invoice.then(|| Invoice {
                id: Uuid::new_v4(),
                payment_id,
                invoice_number: "F-0A1B2C3D".to_string(),
                tax_id: "4455667".to_string(),
                legal_name: "MARIA QUISPE".to_string(),
                issued_at: paid_at,
                control_code: None,
                pdf_path: None,
            }),
            concept_name: None,
            billed_username: "mquispe".to_string(),
            case_title: "Divorcio Quispe".to_string(),
        }
    }

    #[test]
    fn test_history_row_formats_payment() {
        let row = HistoryRow::from(details(true));
        assert_eq!(row.paid_at, "14/03/2026 09:30");
        assert_eq!(row.concept_name, "-");
        assert_eq!(row.amount, "150.00");
        assert_eq!(row.method, "Pago QR");
        assert_eq!(row.status, "completed");
        assert_eq!(row.invoice_number.as_deref(), Some("F-0A1B2C3D"));
    }

    #[test]
    fn test_invoice_document_requires_invoice() {
        assert!(invoice_document(details(false), "bob").is_none());

        let document = invoice_document(details(true), "bob").unwrap();
        assert_eq!(document.invoice_number, "F-0A1B2C3D");
        assert_eq!(document.legal_name, "MARIA QUISPE");
        assert_eq!(document.method_label, "Pago QR");
        assert_eq!(document.currency, "BOB");
    }

    mod invoice_download {
        use std::sync::Arc;

        use axum::{
            body::Body,
            http::{Request, StatusCode, header::AUTHORIZATION},
            middleware::from_fn_with_state,
        };
        use casebill_core::pdf::{InvoiceRenderer, RenderError};
        use casebill_db::entities::{
            cases, invoices, payments,
            sea_orm_active_enums::{CaseStatus, PaymentMethod, PaymentStatus},
            users,
        };
        use chrono::{DateTime, FixedOffset, TimeZone, Utc};
        use http_body_util::BodyExt;
        use rust_decimal_macros::dec;
        use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
        use tower::ServiceExt;
        use uuid::Uuid;

        use super::super::*;
        use crate::middleware::auth_middleware;
        use crate::test_support::{FakeGateway, bearer, json_body, test_state};

        struct FailingRenderer;

        impl InvoiceRenderer for FailingRenderer {
            fn render(&self, _document: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
                Err(RenderError("font table missing".to_string()))
            }
        }

        fn paid_at() -> DateTime<FixedOffset> {
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
                .unwrap()
                .fixed_offset()
        }

        /// Rows returned, in order, by the payment lookup and its detail queries.
        fn store(payment_id: Uuid, invoice_number: Option<&str>) -> DatabaseConnection {
            let case_id = Uuid::new_v4();
            let user_id = Uuid::new_v4();
            let invoice = invoice_number.map(|number| invoices::Model {
                id: Uuid::new_v4(),
                payment_id,
                invoice_number: number.to_string(),
                tax_id: "4455667".to_string(),
                legal_name: "MARIA QUISPE".to_string(),
                issued_at: paid_at(),
                control_code: None,
                pdf_path: None,
            });

            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![payments::Model {
                    id: payment_id,
                    case_id,
                    billed_user_id: user_id,
                    concept_id: None,
                    amount: dec!(150.00),
                    method: PaymentMethod::Qr,
                    status: PaymentStatus::Completed,
                    paid_at: paid_at(),
                    external_transaction_id: None,
                    updated_at: paid_at(),
                }]])
                .append_query_results([invoice.into_iter().collect::<Vec<_>>()])
                .append_query_results([vec![users::Model {
                    id: user_id,
                    username: "mquispe".to_string(),
                    email: "mquispe@example.com".to_string(),
                    full_name: "Maria Quispe".to_string(),
                    is_staff: false,
                    is_active: true,
                    created_at: paid_at(),
                }]])
                .append_query_results([vec![cases::Model {
                    id: case_id,
                    title: "Divorcio Quispe".to_string(),
                    status: CaseStatus::Open,
                    created_at: paid_at(),
                }]])
                .into_connection()
        }

        fn app(state: AppState) -> Router {
            routes()
                .layer(from_fn_with_state(state.clone(), auth_middleware))
                .with_state(state)
        }

        fn download(state: &AppState, payment_id: Uuid) -> Request<Body> {
            Request::builder()
                .uri(format!("/payments/{payment_id}/invoice.pdf"))
                .header(AUTHORIZATION, bearer(state, Uuid::new_v4(), false))
                .body(Body::empty())
                .unwrap()
        }

        #[tokio::test]
        async fn test_pdf_is_served_as_named_attachment() {
            let payment_id = Uuid::new_v4();
            let state = AppState {
                db: Arc::new(store(payment_id, Some("F-0A1B2C3D"))),
                ..test_state(Arc::new(FakeGateway::default()))
            };
            let request = download(&state, payment_id);

            let response = app(state).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
            assert_eq!(
                response.headers()[header::CONTENT_DISPOSITION],
                "attachment; filename=\"Factura_F-0A1B2C3D.pdf\""
            );
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert!(bytes.starts_with(b"%PDF"));
        }

        #[tokio::test]
        async fn test_payment_without_invoice_is_not_found() {
            let payment_id = Uuid::new_v4();
            let state = AppState {
                db: Arc::new(store(payment_id, None)),
                ..test_state(Arc::new(FakeGateway::default()))
            };
            let request = download(&state, payment_id);

            let response = app(state).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let body = json_body(response).await;
            assert_eq!(body["error"], "NOT_FOUND");
        }

        #[tokio::test]
        async fn test_missing_payment_is_not_found() {
            let state = AppState {
                db: Arc::new(
                    MockDatabase::new(DatabaseBackend::Postgres)
                        .append_query_results([Vec::<payments::Model>::new()])
                        .into_connection(),
                ),
                ..test_state(Arc::new(FakeGateway::default()))
            };
            let request = download(&state, Uuid::new_v4());

            let response = app(state).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_render_failure_hides_details() {
            let payment_id = Uuid::new_v4();
            let state = AppState {
                db: Arc::new(store(payment_id, Some("F-0A1B2C3D"))),
                renderer: Arc::new(FailingRenderer),
                ..test_state(Arc::new(FakeGateway::default()))
            };
            let request = download(&state, payment_id);

            let response = app(state).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = json_body(response).await;
            assert_eq!(body["message"], "An internal error occurred");
            assert!(!body.to_string().contains("font table"));
        }
    }
}
