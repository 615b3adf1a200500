//! WebhookEventRepository port - Ledger of successfully processed deliveries.
//!
//! Both providers deliver at least once and retry on any 5xx, so the same
//! event can arrive many times. The ledger short-circuits deliveries that
//! were already projected. Only successes are recorded: a failed projection
//! must stay retryable.

use async_trait::async_trait;

use crate::domain::billing::PaymentProvider;
use crate::domain::foundation::{DomainError, Timestamp};

/// Record of a processed webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    pub provider: PaymentProvider,

    /// Provider event id (Stripe `evt_…`, Razorpay header id or body digest).
    pub event_id: String,

    /// Raw provider event type (e.g. `payment.captured`).
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: Timestamp,

    /// Processing result; only `success` is ever written.
    pub result: String,

    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// Creates a new success record.
    pub fn success(
        provider: PaymentProvider,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        processed_at: Timestamp,
    ) -> Self {
        Self {
            provider,
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at,
            result: "success".to_string(),
            payload,
        }
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (a concurrent delivery won the race).
    AlreadyExists,
}

/// Port for storing and retrieving processed webhook events.
///
/// Implementations should use database constraints (PRIMARY KEY on
/// `(provider, event_id)`) to absorb concurrent deliveries of one event.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event.
    ///
    /// Returns `None` if the event hasn't been processed yet.
    async fn find(
        &self,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Attempt to save a webhook event record with `ON CONFLICT DO NOTHING`
    /// semantics.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Delete records processed before the given timestamp.
    ///
    /// Returns the number of records deleted.
    async fn delete_before(&self, timestamp: Timestamp) -> Result<u64, DomainError>;
}
