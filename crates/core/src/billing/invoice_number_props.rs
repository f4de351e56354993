//! Property-based tests for invoice number generation.

use proptest::prelude::*;

use super::invoice_number::{InvoiceNumber, InvoiceNumberGenerator, RandomInvoiceNumbers};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every generated number matches `F-[A-Z0-9]{8}`.
    #[test]
    fn prop_generated_numbers_are_well_formed(_seed in any::<u64>()) {
        let number = RandomInvoiceNumbers.generate();
        prop_assert!(InvoiceNumber::parse(number.as_str()).is_some());
    }

    /// Parsing accepts exactly the strings in the invoice alphabet.
    #[test]
    fn prop_parse_accepts_alphabet(suffix in "[A-Z0-9]{8}") {
        let raw = format!("F-{suffix}");
        let parsed = InvoiceNumber::parse(&raw);
        prop_assert_eq!(parsed.map(InvoiceNumber::into_string), Some(raw));
    }

    /// Lowercase suffixes are rejected.
    #[test]
    fn prop_parse_rejects_lowercase(suffix in "[a-z]{8}") {
        let raw = format!("F-{suffix}");
        prop_assert!(InvoiceNumber::parse(&raw).is_none());
    }
}
