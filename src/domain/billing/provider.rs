//! Payment provider identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// External payment provider that owns an entity and signs its webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Razorpay,
}

impl PaymentProvider {
    /// Database / log representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Razorpay => "razorpay",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProvider::Stripe),
            "razorpay" => Ok(PaymentProvider::Razorpay),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        for provider in [PaymentProvider::Stripe, PaymentProvider::Razorpay] {
            assert_eq!(provider.as_str().parse::<PaymentProvider>(), Ok(provider));
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("paypal".parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn provider_serializes_lowercase() {
        let json = serde_json::to_string(&PaymentProvider::Razorpay).unwrap();
        assert_eq!(json, "\"razorpay\"");
    }
}
