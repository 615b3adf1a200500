//! Background jobs.
//!
//! - `FulfillmentRetryWorker` - Drains the deferred fulfillment queue
//! - `WebhookLedgerPruner` - Enforces the idempotency ledger retention window

mod fulfillment_retry_worker;
mod webhook_ledger_pruner;

pub use fulfillment_retry_worker::{
    FulfillmentRetryWorker, FulfillmentRetryWorkerConfig, RetryBatchSummary,
};
pub use webhook_ledger_pruner::WebhookLedgerPruner;
