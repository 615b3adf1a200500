//! Webhooks domain module.
//!
//! Authenticates provider deliveries and decodes them into [`PaymentEvent`].
//!
//! # Module Structure
//!
//! - `authenticator` - Common trait implemented by every provider verifier
//! - `stripe_verifier` / `razorpay_verifier` - HMAC-SHA256 signature checks
//! - `stripe_event` / `razorpay_event` - Provider payload shapes
//! - `payment_event` - Provider-neutral event and envelope
//! - `webhook_errors` - Error taxonomy with HTTP status mapping

mod authenticator;
mod payment_event;
mod razorpay_event;
mod razorpay_verifier;
mod signature;
mod stripe_event;
mod stripe_verifier;
mod webhook_errors;

pub use authenticator::{DeliveryHeaders, WebhookAuthenticator};
pub use payment_event::{PaymentEvent, WebhookEnvelope};
pub use razorpay_event::RazorpayEvent;
pub use razorpay_verifier::{RazorpayWebhookVerifier, EVENT_ID_HEADER as RAZORPAY_EVENT_ID_HEADER};
pub use stripe_event::StripeEvent;
pub use stripe_verifier::{SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub use razorpay_verifier::compute_test_signature as razorpay_test_signature;
#[cfg(test)]
pub use stripe_verifier::compute_test_signature as stripe_test_signature;
