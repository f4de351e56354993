//! Billing domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::BillingError;
use super::invoice_number::InvoiceNumber;

/// How a payment was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash at the office.
    #[default]
    Cash,
    /// QR bank transfer.
    Qr,
    /// Card charged through the payment-intent gateway.
    Card,
}

impl PaymentMethod {
    /// Wire/database representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Qr => "qr",
            Self::Card => "card",
        }
    }

    /// Human label used on invoices and HTML screens.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Efectivo",
            Self::Qr => "Pago QR",
            Self::Card => "Tarjeta",
        }
    }
}

/// Payment lifecycle status.
///
/// `Pending` may move to `Completed` or `Failed`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting settlement.
    #[default]
    Pending,
    /// Settled; the payment carries an invoice.
    Completed,
    /// Rejected by the processor.
    Failed,
}

impl PaymentStatus {
    /// Wire/database representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the payment's fields may still be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if moving from `self` to `next` is allowed.
    ///
    /// Staying in the same state is not a transition and is reported as
    /// allowed only for `Pending`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Pending | Self::Completed | Self::Failed)
        )
    }

    /// Validates a transition and returns the new status.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidStatusTransition` when leaving a terminal state.
    pub fn transition_to(self, next: Self) -> Result<Self, BillingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BillingError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a party plays in a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// Demandante; the party billed for the case.
    Claimant,
    /// Demandado.
    Defendant,
    /// Any other participant.
    ThirdParty,
}

/// Person (actor) record from the case directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    /// Person ID.
    pub id: Uuid,
    /// Given names.
    pub first_names: String,
    /// Paternal surname.
    pub paternal_surname: String,
    /// Tax identity (CI/NIT).
    pub tax_id: String,
    /// Linked system account, if the person can log in.
    pub user_id: Option<Uuid>,
}

impl PersonRecord {
    /// Name printed on invoices: given names followed by the paternal surname.
    #[must_use]
    pub fn invoice_name(&self) -> String {
        format!("{} {}", self.first_names.trim(), self.paternal_surname.trim())
            .trim()
            .to_string()
    }
}

/// Client record; a billable party's account, linked to a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// Client ID.
    pub id: Uuid,
    /// Underlying person, when the link is intact.
    pub person: Option<PersonRecord>,
}

/// A role-tagged participant in a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyRecord {
    /// Party ID.
    pub id: Uuid,
    /// Role in the case.
    pub role: PartyRole,
    /// Client behind the party, when the link is intact.
    pub client: Option<ClientRecord>,
}

/// Snapshot of the case → party → client → person graph.
///
/// `parties` are kept in the directory's stable order; the first claimant
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseGraph {
    /// Case ID.
    pub case_id: Uuid,
    /// Parties in stable order.
    pub parties: Vec<PartyRecord>,
}

/// Who is billed and under which tax identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingIdentity {
    /// Tax identity printed on the invoice.
    pub tax_id: String,
    /// Legal name printed on the invoice.
    pub legal_name: String,
    /// User the payment is attributed to.
    pub billed_user_id: Uuid,
}

/// Incoming request to record a payment.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Case being paid.
    pub case_id: Uuid,
    /// Optional catalog concept.
    pub concept_id: Option<Uuid>,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Collection method.
    pub method: PaymentMethod,
    /// Processor reference for card payments.
    pub external_transaction_id: Option<String>,
}

/// Completed payment row to be persisted together with its invoice.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Payment ID, chosen before the invoice so both rows can be written at once.
    pub id: Uuid,
    /// Case being paid.
    pub case_id: Uuid,
    /// Billed user.
    pub billed_user_id: Uuid,
    /// Optional catalog concept.
    pub concept_id: Option<Uuid>,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Collection method.
    pub method: PaymentMethod,
    /// Processor reference.
    pub external_transaction_id: Option<String>,
}

/// A persisted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    /// Payment ID.
    pub id: Uuid,
    /// Case being paid.
    pub case_id: Uuid,
    /// Billed user.
    pub billed_user_id: Uuid,
    /// Optional catalog concept.
    pub concept_id: Option<Uuid>,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Collection method.
    pub method: PaymentMethod,
    /// Current status.
    pub status: PaymentStatus,
    /// When the payment was recorded.
    pub paid_at: DateTime<Utc>,
    /// Processor reference.
    pub external_transaction_id: Option<String>,
}

/// Invoice row to be persisted.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Payment being invoiced.
    pub payment_id: Uuid,
    /// Candidate invoice number.
    pub invoice_number: InvoiceNumber,
    /// Tax identity.
    pub tax_id: String,
    /// Legal name.
    pub legal_name: String,
}

/// A persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    /// Invoice ID.
    pub id: Uuid,
    /// Invoiced payment.
    pub payment_id: Uuid,
    /// Invoice number, unique across the store.
    pub invoice_number: String,
    /// Tax identity.
    pub tax_id: String,
    /// Legal name.
    pub legal_name: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Tax authority control code, when assigned.
    pub control_code: Option<String>,
    /// Stored PDF artifact path, when generated.
    pub pdf_path: Option<String>,
}

/// Outcome of an idempotent invoice issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceIssue {
    /// A new invoice was written.
    Created(Invoice),
    /// The payment already had this invoice; nothing was written.
    AlreadyExists(Invoice),
}

impl InvoiceIssue {
    /// Returns true if this call wrote the invoice.
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Returns the invoice regardless of who wrote it.
    #[must_use]
    pub fn into_invoice(self) -> Invoice {
        match self {
            Self::Created(invoice) | Self::AlreadyExists(invoice) => invoice,
        }
    }
}

/// A completed payment together with its invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayment {
    /// The payment.
    pub payment: Payment,
    /// Its invoice.
    pub invoice: Invoice,
}
