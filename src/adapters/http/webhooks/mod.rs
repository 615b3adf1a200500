//! HTTP adapter for payment webhooks.
//!
//! - `POST /api/webhooks/stripe` - Stripe deliveries (`Stripe-Signature`)
//! - `POST /api/webhooks/razorpay` - Razorpay deliveries (`X-Razorpay-Signature`)
//! - `POST /api/payments/razorpay/verify` - Checkout signature confirmation
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{WebhookApiError, WebhookAppState};
pub use routes::{app_router, payment_routes, webhook_routes};
