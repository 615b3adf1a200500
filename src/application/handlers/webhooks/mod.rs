//! Webhook handlers.
//!
//! - `process_webhook` - Authenticate, deduplicate, project, record
//! - `project_event` - Apply a decoded event to stored rows
//! - `fulfill_order` - Grant licences and unlock generations, deferring failures

mod fulfill_order;
mod process_webhook;
mod project_event;

pub use fulfill_order::{
    FulfillOrderCommand, FulfillmentError, FulfillmentHandler, FulfillmentOutcome,
    FulfillmentSettings,
};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult};
pub use project_event::{EventProjector, ProjectionReport};
