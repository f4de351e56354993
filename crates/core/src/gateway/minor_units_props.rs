//! Property-based tests for minor-unit conversion.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::to_minor_units;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Two-decimal amounts convert exactly.
    #[test]
    fn prop_cents_convert_exactly(cents in 1i64..1_000_000_000_000) {
        prop_assert_eq!(to_minor_units(Decimal::new(cents, 2)).unwrap(), cents);
    }

    /// Extra precision is truncated, never rounded up.
    #[test]
    fn prop_sub_cent_precision_truncates(cents in 1i64..1_000_000_000, extra in 0i64..10) {
        let amount = Decimal::new(cents * 10 + extra, 3);
        prop_assert_eq!(to_minor_units(amount).unwrap(), cents);
    }

    /// Non-positive amounts are always rejected.
    #[test]
    fn prop_non_positive_rejected(cents in -1_000_000_000i64..=0) {
        prop_assert!(to_minor_units(Decimal::new(cents, 2)).is_err());
    }
}
