//! Invoice PDF rendering.

pub mod a4;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use casebill_shared::AppError;

pub use a4::A4InvoiceRenderer;

/// Everything printed on an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    /// Invoice number.
    pub invoice_number: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Tax identity of the billed party.
    pub tax_id: String,
    /// Legal name of the billed party.
    pub legal_name: String,
    /// Tax authority control code, when assigned.
    pub control_code: Option<String>,
    /// Title of the case paid for.
    pub case_title: String,
    /// Concept name, when the payment references one.
    pub concept_name: Option<String>,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Human label of the payment method.
    pub method_label: String,
    /// When the payment was recorded.
    pub paid_at: DateTime<Utc>,
    /// Currency code shown next to the amount.
    pub currency: String,
}

/// PDF rendering failure.
#[derive(Debug, Error)]
#[error("failed to render invoice PDF: {0}")]
pub struct RenderError(pub String);

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Turns an invoice into PDF bytes.
pub trait InvoiceRenderer: Send + Sync {
    /// Render the document.
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, RenderError>;
}

/// Download filename for an invoice: `Factura_<number>.pdf`.
#[must_use]
pub fn attachment_filename(invoice_number: &str) -> String {
    format!("Factura_{invoice_number}.pdf")
}
