//! FulfillmentRetryWorker - Background service draining deferred fulfillment.
//!
//! Webhooks enqueue a task whenever granting access fails; this worker
//! re-runs due tasks until they complete or run out of attempts.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 5s | How often to check for due tasks |
//! | `batch_size` | 50 | Max tasks to retry per poll cycle |
//!
//! ## Graceful Shutdown
//!
//! The worker listens for a shutdown signal and finishes the current batch
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::FulfillmentHandler;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{FulfillmentQueue, FulfillmentTaskStatus};

/// Configuration for the FulfillmentRetryWorker.
#[derive(Debug, Clone)]
pub struct FulfillmentRetryWorkerConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
}

impl Default for FulfillmentRetryWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
        }
    }
}

impl FulfillmentRetryWorkerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBatchSummary {
    pub completed: usize,
    pub rescheduled: usize,
    pub dead: usize,
    /// Tasks whose new state could not be saved. They stay due and are
    /// picked up again next cycle.
    pub failed: usize,
}

impl RetryBatchSummary {
    pub fn total(&self) -> usize {
        self.completed + self.rescheduled + self.dead + self.failed
    }
}

pub struct FulfillmentRetryWorker {
    queue: Arc<dyn FulfillmentQueue>,
    handler: Arc<FulfillmentHandler>,
    config: FulfillmentRetryWorkerConfig,
}

impl FulfillmentRetryWorker {
    pub fn new(queue: Arc<dyn FulfillmentQueue>, handler: Arc<FulfillmentHandler>) -> Self {
        Self::with_config(queue, handler, FulfillmentRetryWorkerConfig::default())
    }

    pub fn with_config(
        queue: Arc<dyn FulfillmentQueue>,
        handler: Arc<FulfillmentHandler>,
        config: FulfillmentRetryWorkerConfig,
    ) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Run the worker loop until the shutdown signal is received.
    ///
    /// Batch failures are logged and retried on the next tick; the loop only
    /// ends on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.log_batch(self.poll_once().await);
                        tracing::info!("Fulfillment retry worker stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.log_batch(self.poll_once().await);
                }
            }
        }
    }

    /// Retry every task that is due now.
    pub async fn poll_once(&self) -> Result<RetryBatchSummary, DomainError> {
        self.poll_at(Timestamp::now()).await
    }

    /// Retry every task due at `now`.
    ///
    /// Only a failure to list due tasks fails the batch; a task that cannot
    /// be saved is logged and counted while the rest of the batch proceeds.
    pub async fn poll_at(&self, now: Timestamp) -> Result<RetryBatchSummary, DomainError> {
        let tasks = self.queue.due(now, self.config.batch_size).await?;
        let mut summary = RetryBatchSummary::default();

        for task in tasks {
            let task_id = task.id;
            let task = match self.handler.retry(task, now).await {
                Ok(task) => task,
                Err(e) => {
                    tracing::error!(%task_id, error = %e, "Failed to save fulfillment task");
                    summary.failed += 1;
                    continue;
                }
            };
            match task.status {
                FulfillmentTaskStatus::Completed => summary.completed += 1,
                FulfillmentTaskStatus::Pending => summary.rescheduled += 1,
                FulfillmentTaskStatus::Dead => {
                    tracing::error!(
                        task_id = %task.id,
                        payment_id = %task.payment_id,
                        attempts = task.attempts,
                        error = ?task.last_error,
                        "Fulfillment task is dead, manual intervention required"
                    );
                    summary.dead += 1;
                }
            }
        }

        Ok(summary)
    }

    fn log_batch(&self, result: Result<RetryBatchSummary, DomainError>) {
        match result {
            Ok(summary) if summary.total() > 0 => tracing::info!(
                completed = summary.completed,
                rescheduled = summary.rescheduled,
                dead = summary.dead,
                failed = summary.failed,
                "Fulfillment retry batch finished"
            ),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Fulfillment retry batch failed"),
        }
    }
}
