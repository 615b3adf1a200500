//! Application handlers.
//!
//! Command handlers that orchestrate domain operations over the ports.

pub mod webhooks;

pub use webhooks::{
    EventProjector, FulfillOrderCommand, FulfillmentError, FulfillmentHandler, FulfillmentOutcome,
    FulfillmentSettings, ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult,
    ProjectionReport,
};
