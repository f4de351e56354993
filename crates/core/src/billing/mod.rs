//! Payment recording and invoice issuance.
//!
//! This module implements the billing core:
//! - Payment, invoice and case-graph domain types
//! - The payment status state machine
//! - Billing identity derivation from the case graph
//! - Invoice number generation
//! - The payment resolver that records a payment and issues its invoice

pub mod error;
pub mod identity;
pub mod invoice_number;
pub mod service;
pub mod types;

#[cfg(test)]
mod invoice_number_props;

pub use error::BillingError;
pub use identity::{ANONYMOUS_LEGAL_NAME, ANONYMOUS_TAX_ID, resolve_billing_identity};
pub use invoice_number::{
    INVOICE_NUMBER_PREFIX, InvoiceNumber, InvoiceNumberGenerator, RandomInvoiceNumbers,
};
pub use service::{BillingRepository, MAX_INVOICE_NUMBER_ATTEMPTS, PaymentResolver};
pub use types::{
    BillingIdentity, CaseGraph, ClientRecord, Invoice, InvoiceIssue, NewInvoice, NewPayment,
    PartyRecord, PartyRole, Payment, PaymentMethod, PaymentRequest, PaymentStatus, PersonRecord,
    ResolvedPayment,
};
