//! FulfillmentQueue port - Durable retry queue for failed fulfillment.
//!
//! When granting access fails after a capture, the webhook is still
//! acknowledged and a task is written here instead. The retry worker drains
//! due tasks with exponential backoff until they complete or are declared
//! dead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::FulfillmentTarget;
use crate::domain::foundation::{DomainError, Timestamp, ValidationError};

/// Upper bound on the delay between two attempts.
pub const MAX_BACKOFF_SECS: i64 = 3_600;

/// Status of a fulfillment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentTaskStatus {
    /// Waiting for its next attempt
    Pending,
    /// Access granted
    Completed,
    /// Gave up after the maximum number of attempts
    Dead,
}

impl FulfillmentTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentTaskStatus::Pending => "pending",
            FulfillmentTaskStatus::Completed => "completed",
            FulfillmentTaskStatus::Dead => "dead",
        }
    }
}

impl FromStr for FulfillmentTaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FulfillmentTaskStatus::Pending),
            "completed" => Ok(FulfillmentTaskStatus::Completed),
            "dead" => Ok(FulfillmentTaskStatus::Dead),
            other => Err(ValidationError::invalid_format(
                "fulfillment_task.status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

/// A deferred fulfillment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentTask {
    pub id: Uuid,
    pub payment_id: String,
    pub order_id: Option<String>,
    /// Target resolved at capture time, if inline metadata carried one.
    pub target: Option<FulfillmentTarget>,
    pub user_id: Option<String>,
    pub status: FulfillmentTaskStatus,
    /// Failed attempts so far (the inline attempt counts as the first).
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FulfillmentTask {
    /// Creates a pending task after the inline attempt failed.
    pub fn after_failure(
        payment_id: impl Into<String>,
        order_id: Option<String>,
        target: Option<FulfillmentTarget>,
        user_id: Option<String>,
        error: impl Into<String>,
        base_backoff_secs: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: payment_id.into(),
            order_id,
            target,
            user_id,
            status: FulfillmentTaskStatus::Pending,
            attempts: 1,
            last_error: Some(error.into()),
            next_attempt_at: now.plus_secs(backoff_secs(base_backoff_secs, 1)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the task as completed.
    pub fn mark_completed(&mut self, now: Timestamp) {
        self.status = FulfillmentTaskStatus::Completed;
        self.last_error = None;
        self.updated_at = now;
    }

    /// Record a failed retry; the task dies once `max_attempts` is reached.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        max_attempts: u32,
        base_backoff_secs: i64,
        now: Timestamp,
    ) {
        self.attempts += 1;
        self.last_error = Some(error.into());
        self.updated_at = now;
        if self.attempts >= max_attempts {
            self.status = FulfillmentTaskStatus::Dead;
        } else {
            self.next_attempt_at = now.plus_secs(backoff_secs(base_backoff_secs, self.attempts));
        }
    }
}

/// Delay before the next attempt: `base * 2^attempts`, capped at one hour.
pub fn backoff_secs(base_secs: i64, attempts: u32) -> i64 {
    if attempts >= 32 {
        return MAX_BACKOFF_SECS;
    }
    base_secs.saturating_mul(1_i64 << attempts).clamp(0, MAX_BACKOFF_SECS)
}

/// Port for the durable fulfillment retry queue.
#[async_trait]
pub trait FulfillmentQueue: Send + Sync {
    async fn enqueue(&self, task: &FulfillmentTask) -> Result<(), DomainError>;

    /// Pending tasks whose `next_attempt_at` is not after `now`, oldest first.
    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<FulfillmentTask>, DomainError>;

    /// Persist the task's new status, attempt count and schedule.
    async fn update(&self, task: &FulfillmentTask) -> Result<(), DomainError>;
}
