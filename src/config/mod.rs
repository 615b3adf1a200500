//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Variables carry the `SOUND_LAB` prefix and nested values
//! are separated with a double underscore. The provider credentials and
//! `DATABASE_URL` are also accepted under their conventional bare names.
//!
//! # Example
//!
//! ```no_run
//! use sound_lab_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod fulfillment;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use fulfillment::{FulfillmentConfig, LedgerConfig};
pub use payment::{PaymentConfig, RazorpayConfig, StripeConfig};
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Bare variable names accepted as fallbacks, with the config key they fill.
const BARE_VARIABLES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("STRIPE_SECRET_KEY", "payment.stripe.secret_key"),
    ("STRIPE_WEBHOOK_SECRET", "payment.stripe.webhook_secret"),
    ("RAZORPAY_KEY_ID", "payment.razorpay.key_id"),
    ("RAZORPAY_KEY_SECRET", "payment.razorpay.key_secret"),
    ("RAZORPAY_WEBHOOK_SECRET", "payment.razorpay.webhook_secret"),
];

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Stripe and Razorpay credentials
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Fulfillment retry queue
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,

    /// Processed-event ledger retention
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Seeds defaults from the bare provider variables
    /// 3. Reads `SOUND_LAB__*` variables, which take precedence
    ///
    /// # Environment Variable Format
    ///
    /// - `SOUND_LAB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SOUND_LAB__PAYMENT__STRIPE__WEBHOOK_SECRET=...` -> `payment.stripe.webhook_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    /// Missing credentials are reported by [`AppConfig::validate()`].
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        for (variable, key) in BARE_VARIABLES {
            if let Ok(value) = std::env::var(variable) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let config = builder
            .add_source(
                config::Environment::default()
                    .prefix("SOUND_LAB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step. The binary refuses to start on any error.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first missing or malformed value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.fulfillment.validate()?;
        self.ledger.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
