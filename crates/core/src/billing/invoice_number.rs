//! Invoice number generation.
//!
//! Format: `F-` followed by eight characters from `[A-Z0-9]`. Numbers are
//! random; uniqueness is enforced by the store and collisions are retried by
//! the resolver.

use rand::Rng;

/// Prefix shared by every invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "F-";

/// Length of the random suffix.
pub const INVOICE_NUMBER_SUFFIX_LEN: usize = 8;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A well-formed invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Draws a fresh random invoice number.
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..INVOICE_NUMBER_SUFFIX_LEN)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        Self(format!("{INVOICE_NUMBER_PREFIX}{suffix}"))
    }

    /// Accepts a string only if it matches `F-[A-Z0-9]{8}`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix(INVOICE_NUMBER_PREFIX)?;
        let well_formed = suffix.len() == INVOICE_NUMBER_SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        well_formed.then(|| Self(s.to_string()))
    }

    /// String form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes into the string form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate invoice numbers.
pub trait InvoiceNumberGenerator: Send + Sync {
    /// Returns the next candidate.
    fn generate(&self) -> InvoiceNumber;
}

/// Uniform random generator over the invoice alphabet.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInvoiceNumbers;

impl InvoiceNumberGenerator for RandomInvoiceNumbers {
    fn generate(&self) -> InvoiceNumber {
        InvoiceNumber::random()
    }
}
