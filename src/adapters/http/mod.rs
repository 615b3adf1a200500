//! HTTP adapters - REST API implementations.

pub mod webhooks;

pub use webhooks::{app_router, WebhookAppState};
