//! Payment-intent gateway.
//!
//! Card payments are authorized client-side; this module only asks the
//! provider for a payment intent and hands its client secret back.

pub mod error;
pub mod stripe;

#[cfg(test)]
mod minor_units_props;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

pub use error::GatewayError;
pub use stripe::StripeGateway;

/// A payment intent creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    /// User creating the intent, forwarded as metadata.
    pub submitter_id: Uuid,
}

/// A payment intent as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Provider intent ID.
    pub id: String,
    /// Opaque secret the browser uses to confirm the payment.
    pub client_secret: String,
}

/// Creates payment intents at a third-party card processor.
#[async_trait]
pub trait PaymentIntentGateway: Send + Sync {
    /// Create a payment intent.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;
}

/// Converts a currency amount into integer minor units (× 100).
///
/// Fractions of a minor unit are truncated toward zero.
///
/// # Errors
///
/// Returns `GatewayError::InvalidAmount` if the result is not positive or
/// does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    let minor = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?
        .trunc()
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?;

    if minor <= 0 {
        return Err(GatewayError::InvalidAmount(amount.to_string()));
    }
    Ok(minor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(12.50), 1250)]
    #[case(dec!(100), 10000)]
    #[case(dec!(0.01), 1)]
    #[case(dec!(19.999), 1999)]
    fn test_to_minor_units(#[case] amount: Decimal, #[case] expected: i64) {
        assert_eq!(to_minor_units(amount).unwrap(), expected);
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-3.00))]
    #[case(dec!(0.004))]
    fn test_to_minor_units_rejects_non_positive(#[case] amount: Decimal) {
        assert!(matches!(
            to_minor_units(amount),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_to_minor_units_rejects_overflow() {
        assert!(to_minor_units(Decimal::MAX).is_err());
    }
}
