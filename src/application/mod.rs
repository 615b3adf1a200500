//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers receive their ports as `Arc<dyn Port>` and never touch adapters.

pub mod handlers;

pub use handlers::{
    EventProjector, FulfillOrderCommand, FulfillmentError, FulfillmentHandler, FulfillmentOutcome,
    FulfillmentSettings, ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult,
    ProjectionReport,
};
