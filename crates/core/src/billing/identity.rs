//! Billing identity derivation.
//!
//! The tax identity printed on an invoice belongs to the case's claimant,
//! reached through case → party → client → person. Any broken link degrades
//! to the anonymous identity and the payment is attributed to the submitter.

use uuid::Uuid;

use super::types::{BillingIdentity, CaseGraph, PartyRole, PersonRecord};

/// Tax identity used when no claimant person can be reached.
pub const ANONYMOUS_TAX_ID: &str = "0";

/// Legal name used when no claimant person can be reached.
pub const ANONYMOUS_LEGAL_NAME: &str = "Sin Nombre";

/// First claimant person reachable from the case, if any.
#[must_use]
pub fn claimant_person(graph: &CaseGraph) -> Option<&PersonRecord> {
    graph
        .parties
        .iter()
        .find(|party| party.role == PartyRole::Claimant)
        .and_then(|party| party.client.as_ref())
        .and_then(|client| client.person.as_ref())
}

/// Derives who is billed for a payment on this case.
///
/// Never fails: a missing claimant, client or person yields the anonymous
/// identity. The billed user is the claimant's own account when present,
/// otherwise the submitter.
#[must_use]
pub fn resolve_billing_identity(graph: &CaseGraph, submitter: Uuid) -> BillingIdentity {
    match claimant_person(graph) {
        Some(person) => BillingIdentity {
            tax_id: person.tax_id.clone(),
            legal_name: person.invoice_name(),
            billed_user_id: person.user_id.unwrap_or(submitter),
        },
        None => BillingIdentity {
            tax_id: ANONYMOUS_TAX_ID.to_string(),
            legal_name: ANONYMOUS_LEGAL_NAME.to_string(),
            billed_user_id: submitter,
        },
    }
}

impl BillingIdentity {
    /// Returns true when the anonymous fallback was used.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.tax_id == ANONYMOUS_TAX_ID && self.legal_name == ANONYMOUS_LEGAL_NAME
    }
}
