//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! Every write is an `INSERT ... ON CONFLICT` keyed by the provider-issued
//! id, so a replayed projection rewrites the same row instead of failing.
//!
//! - `PostgresPaymentRepository`, `PostgresOrderRepository`,
//!   `PostgresSubscriptionRepository`, `PostgresRefundRepository`
//! - `PostgresEntitlementRepository` - `user_licenses` and `generations`
//! - `PostgresWebhookEventRepository` - Idempotency ledger
//! - `PostgresFulfillmentQueue` - Deferred fulfillment tasks

mod entitlement_repository;
mod fulfillment_queue;
mod order_repository;
mod payment_repository;
mod refund_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use entitlement_repository::PostgresEntitlementRepository;
pub use fulfillment_queue::PostgresFulfillmentQueue;
pub use order_repository::PostgresOrderRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use refund_repository::PostgresRefundRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::foundation::{DomainError, Timestamp};
use chrono::{DateTime, Utc};

/// Maps a sqlx failure to a database `DomainError` with context.
fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from_datetime)
}

fn datetime(value: Option<Timestamp>) -> Option<DateTime<Utc>> {
    value.map(|ts| *ts.as_datetime())
}
