//! FulfillmentHandler - Grants the access a captured payment bought.
//!
//! Fulfillment is best-effort inside the webhook but never silent: a failed
//! attempt is logged and turned into a durable [`FulfillmentTask`] that the
//! retry worker drains later. Only a failure to enqueue reaches the caller.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::billing::{FulfillmentTarget, GrantResult, OrderMetadata, UserLicense};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::webhooks::WebhookError;
use crate::ports::{EntitlementRepository, FulfillmentQueue, FulfillmentTask, OrderRepository};

/// Retry policy for deferred fulfillment.
#[derive(Debug, Clone, Copy)]
pub struct FulfillmentSettings {
    pub max_attempts: u32,
    pub base_backoff_secs: i64,
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff_secs: 30,
        }
    }
}

/// Command to fulfill a captured payment.
#[derive(Debug, Clone, PartialEq)]
pub struct FulfillOrderCommand {
    pub payment_id: String,
    /// Order the payment belongs to, if the provider linked one.
    pub order_id: Option<String>,
    /// Metadata carried on the payment itself (Stripe intents carry it
    /// inline; Razorpay payments carry checkout notes).
    pub metadata: OrderMetadata,
}

/// Result of a fulfillment attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FulfillmentOutcome {
    LicenseGranted {
        user_id: String,
        license_id: String,
    },
    LicenseAlreadyGranted {
        user_id: String,
        license_id: String,
    },
    GenerationUnlocked {
        generation_id: String,
    },
    /// The order bought nothing that needs unlocking (e.g. a subscription).
    NothingToFulfill,
    /// The attempt failed and was queued for retry.
    Deferred { task_id: Uuid },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FulfillmentError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("no user to grant licence {license_id} to")]
    MissingUserId { license_id: String },

    #[error("generation not found: {0}")]
    GenerationNotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<DomainError> for FulfillmentError {
    fn from(err: DomainError) -> Self {
        FulfillmentError::Database(err.to_string())
    }
}

/// Everything needed to (re)run one fulfillment.
struct Attempt<'a> {
    payment_id: &'a str,
    order_id: Option<&'a str>,
    target: Option<FulfillmentTarget>,
    user_id: Option<String>,
}

pub struct FulfillmentHandler {
    orders: Arc<dyn OrderRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    queue: Arc<dyn FulfillmentQueue>,
    settings: FulfillmentSettings,
}

impl FulfillmentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        queue: Arc<dyn FulfillmentQueue>,
        settings: FulfillmentSettings,
    ) -> Self {
        Self {
            orders,
            entitlements,
            queue,
            settings,
        }
    }

    /// Fulfills a captured payment, deferring to the retry queue on failure.
    pub async fn handle(
        &self,
        cmd: FulfillOrderCommand,
        now: Timestamp,
    ) -> Result<FulfillmentOutcome, WebhookError> {
        let attempt = Attempt {
            payment_id: &cmd.payment_id,
            order_id: cmd.order_id.as_deref(),
            target: cmd.metadata.fulfillment_target(),
            user_id: cmd.metadata.user_id.clone(),
        };

        let error = match self.attempt(&attempt, now).await {
            Ok(outcome) => return Ok(outcome),
            Err(error) => error,
        };

        let task = FulfillmentTask::after_failure(
            cmd.payment_id.clone(),
            cmd.order_id.clone(),
            attempt.target.clone(),
            attempt.user_id.clone(),
            error.to_string(),
            self.settings.base_backoff_secs,
            now,
        );
        self.queue
            .enqueue(&task)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?;

        tracing::error!(
            payment_id = %cmd.payment_id,
            order_id = ?cmd.order_id,
            task_id = %task.id,
            error = %error,
            "Fulfillment failed, queued for retry"
        );

        Ok(FulfillmentOutcome::Deferred { task_id: task.id })
    }

    /// Re-runs a queued task and persists its new state.
    pub async fn retry(
        &self,
        mut task: FulfillmentTask,
        now: Timestamp,
    ) -> Result<FulfillmentTask, DomainError> {
        let attempt = Attempt {
            payment_id: &task.payment_id,
            order_id: task.order_id.as_deref(),
            target: task.target.clone(),
            user_id: task.user_id.clone(),
        };

        match self.attempt(&attempt, now).await {
            Ok(outcome) => {
                tracing::info!(task_id = %task.id, outcome = ?outcome, "Deferred fulfillment completed");
                task.mark_completed(now);
            }
            Err(error) => {
                task.mark_failed(
                    error.to_string(),
                    self.settings.max_attempts,
                    self.settings.base_backoff_secs,
                    now,
                );
                tracing::error!(
                    task_id = %task.id,
                    payment_id = %task.payment_id,
                    attempts = task.attempts,
                    status = task.status.as_str(),
                    error = %error,
                    "Deferred fulfillment failed"
                );
            }
        }

        self.queue.update(&task).await?;
        Ok(task)
    }

    async fn attempt(
        &self,
        attempt: &Attempt<'_>,
        now: Timestamp,
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        let mut target = attempt.target.clone();
        let mut user_id = attempt.user_id.clone();

        let needs_order = target.is_none()
            || (matches!(target, Some(FulfillmentTarget::License { .. })) && user_id.is_none());

        if needs_order {
            if let Some(order_id) = attempt.order_id {
                let order = self
                    .orders
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.to_string()))?;
                target = target.or_else(|| order.metadata.fulfillment_target());
                user_id = user_id
                    .or_else(|| order.user_id.clone())
                    .or_else(|| order.metadata.user_id.clone());
            }
        }

        match target {
            None => Ok(FulfillmentOutcome::NothingToFulfill),
            Some(FulfillmentTarget::License { license_id }) => {
                let user_id = user_id.ok_or_else(|| FulfillmentError::MissingUserId {
                    license_id: license_id.clone(),
                })?;
                let license = UserLicense::grant(&user_id, &license_id, attempt.payment_id, now);
                match self.entitlements.grant_license(&license).await? {
                    GrantResult::Granted => {
                        tracing::info!(%user_id, %license_id, "Licence granted");
                        Ok(FulfillmentOutcome::LicenseGranted { user_id, license_id })
                    }
                    GrantResult::AlreadyGranted => {
                        Ok(FulfillmentOutcome::LicenseAlreadyGranted { user_id, license_id })
                    }
                }
            }
            Some(FulfillmentTarget::Generation { generation_id }) => {
                let found = self
                    .entitlements
                    .mark_generation_paid(&generation_id, attempt.payment_id, now)
                    .await?;
                if !found {
                    return Err(FulfillmentError::GenerationNotFound(generation_id));
                }
                tracing::info!(%generation_id, "Generation unlocked");
                Ok(FulfillmentOutcome::GenerationUnlocked { generation_id })
            }
        }
    }
}
