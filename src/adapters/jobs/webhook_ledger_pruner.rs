//! WebhookLedgerPruner - Periodically removes old idempotency records.
//!
//! Providers stop retrying a delivery after a few days, so ledger rows older
//! than the retention window can no longer short-circuit anything.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::WebhookEventRepository;

pub struct WebhookLedgerPruner {
    ledger: Arc<dyn WebhookEventRepository>,
    retention_days: i64,
    interval: Duration,
}

impl WebhookLedgerPruner {
    pub fn new(ledger: Arc<dyn WebhookEventRepository>, retention_days: i64, interval: Duration) -> Self {
        Self {
            ledger,
            retention_days,
            interval,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }

                _ = interval.tick() => {
                    match self.prune_at(Timestamp::now()).await {
                        Ok(0) => {}
                        Ok(deleted) => tracing::info!(deleted, "Pruned webhook ledger"),
                        Err(e) => tracing::error!(error = %e, "Failed to prune webhook ledger"),
                    }
                }
            }
        }
    }

    /// Deletes records processed more than `retention_days` before `now`.
    pub async fn prune_at(&self, now: Timestamp) -> Result<u64, DomainError> {
        self.ledger
            .delete_before(now.minus_days(self.retention_days))
            .await
    }
}
