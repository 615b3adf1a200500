//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing Ports
//!
//! - `PaymentRepository`, `OrderRepository`, `SubscriptionRepository`,
//!   `RefundRepository` - Upsert-by-provider-id row access
//! - `EntitlementRepository` - Licence grants and generation unlocks
//!
//! ## Webhook Ports
//!
//! - `WebhookEventRepository` - Idempotency ledger of processed deliveries
//! - `FulfillmentQueue` - Durable retry queue for failed fulfillment

mod entitlement_repository;
mod fulfillment_queue;
mod order_repository;
mod payment_repository;
mod refund_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use entitlement_repository::EntitlementRepository;
pub use fulfillment_queue::{
    backoff_secs, FulfillmentQueue, FulfillmentTask, FulfillmentTaskStatus, MAX_BACKOFF_SECS,
};
pub use order_repository::OrderRepository;
pub use payment_repository::PaymentRepository;
pub use refund_repository::RefundRepository;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{SaveResult, WebhookEventRecord, WebhookEventRepository};
