//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL repositories and fulfillment queue
//! - `memory` - In-memory store for tests and local runs
//! - `http` - Axum routes for provider webhooks
//! - `jobs` - Background workers

pub mod http;
pub mod jobs;
pub mod memory;
pub mod postgres;

pub use jobs::{FulfillmentRetryWorker, FulfillmentRetryWorkerConfig, WebhookLedgerPruner};
pub use memory::InMemoryBillingStore;
