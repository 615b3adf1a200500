//! Payment provider configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;

use super::error::ValidationError;

/// Payment configuration for both providers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub stripe: StripeConfig,

    #[serde(default)]
    pub razorpay: RazorpayConfig,
}

/// Stripe credentials.
///
/// Also read from the bare `STRIPE_SECRET_KEY` and `STRIPE_WEBHOOK_SECRET`
/// variables.
#[derive(Clone, Deserialize)]
pub struct StripeConfig {
    #[serde(default)]
    pub secret_key: String,

    #[serde(default)]
    pub webhook_secret: String,

    /// Maximum age of a signed `Stripe-Signature` timestamp
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

/// Razorpay credentials.
///
/// Also read from `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` and
/// `RAZORPAY_WEBHOOK_SECRET`.
#[derive(Clone, Default, Deserialize)]
pub struct RazorpayConfig {
    #[serde(default)]
    pub key_id: String,

    /// Signs checkout callbacks (`order_id|payment_id`)
    #[serde(default)]
    pub key_secret: String,

    /// Signs webhook bodies
    #[serde(default)]
    pub webhook_secret: String,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.stripe.validate()?;
        self.razorpay.validate()
    }
}

impl StripeConfig {
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    pub fn webhook_secret(&self) -> SecretString {
        SecretString::new(self.webhook_secret.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_SECRET_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !self.secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        Ok(())
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &redacted(&self.secret_key))
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .finish()
    }
}

impl RazorpayConfig {
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    pub fn webhook_secret(&self) -> SecretString {
        SecretString::new(self.webhook_secret.clone())
    }

    pub fn key_secret(&self) -> SecretString {
        SecretString::new(self.key_secret.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key_id.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_KEY_ID"));
        }
        if self.key_secret.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_KEY_SECRET"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_WEBHOOK_SECRET"));
        }
        if !self.key_id.starts_with("rzp_") {
            return Err(ValidationError::InvalidRazorpayKeyId);
        }
        Ok(())
    }
}

impl fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &redacted(&self.key_secret))
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}

fn default_signature_tolerance() -> i64 {
    300
}
