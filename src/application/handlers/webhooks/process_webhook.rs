//! ProcessWebhookHandler - Command handler for inbound provider webhooks.
//!
//! Authenticates the raw delivery, short-circuits unknown event types and
//! replays, projects the event and records it in the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use super::project_event::{EventProjector, ProjectionReport};
use crate::domain::billing::PaymentProvider;
use crate::domain::foundation::Timestamp;
use crate::domain::webhooks::{DeliveryHeaders, WebhookAuthenticator, WebhookError};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// Command carrying one delivery exactly as received.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    pub provider: PaymentProvider,
    /// Raw request body; signatures cover these exact bytes.
    pub payload: Vec<u8>,
    pub signature: Option<String>,
    /// Provider delivery id header, when the provider sends one.
    pub event_id: Option<String>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessWebhookResult {
    /// Event projected and recorded.
    Processed {
        event_id: String,
        report: ProjectionReport,
    },
    /// Event was already processed; nothing was touched.
    Duplicate { event_id: String },
    /// Event type is not handled; acknowledged without any write.
    Acknowledged { event_type: String },
}

/// Handler for processing payment provider webhooks.
pub struct ProcessWebhookHandler {
    authenticators: HashMap<PaymentProvider, Arc<dyn WebhookAuthenticator>>,
    ledger: Arc<dyn WebhookEventRepository>,
    projector: Arc<EventProjector>,
}

impl ProcessWebhookHandler {
    pub fn new(
        authenticators: Vec<Arc<dyn WebhookAuthenticator>>,
        ledger: Arc<dyn WebhookEventRepository>,
        projector: Arc<EventProjector>,
    ) -> Self {
        Self {
            authenticators: authenticators
                .into_iter()
                .map(|auth| (auth.provider(), auth))
                .collect(),
            ledger,
            projector,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let provider = cmd.provider.as_str();
        let authenticator = self
            .authenticators
            .get(&cmd.provider)
            .ok_or(WebhookError::NotConfigured(provider))?;

        // 1. Verify signature over the raw bytes and decode
        let headers = DeliveryHeaders {
            signature: cmd.signature.as_deref(),
            event_id: cmd.event_id.as_deref(),
        };
        let envelope = match authenticator.authenticate(&cmd.payload, headers) {
            Ok(envelope) => envelope,
            Err(e) if e.is_retryable() => {
                tracing::error!(provider, error = %e, "Webhook verifier unavailable");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "Webhook rejected");
                return Err(e);
            }
        };

        let event_id = envelope.event_id.as_str();
        let event_type = envelope.event_type.as_str();

        // 2. Unknown types are acknowledged so the provider stops retrying
        if !envelope.event.is_recognized() {
            tracing::info!(provider, event_id, event_type, "Ignoring unhandled webhook event type");
            return Ok(ProcessWebhookResult::Acknowledged {
                event_type: envelope.event_type.clone(),
            });
        }

        // 3. Replays of a recorded event touch nothing
        if self.ledger.find(envelope.provider, event_id).await?.is_some() {
            tracing::info!(provider, event_id, event_type, "Duplicate webhook delivery");
            return Ok(ProcessWebhookResult::Duplicate {
                event_id: envelope.event_id.clone(),
            });
        }

        // 4. Project
        let now = Timestamp::now();
        let report = match self.projector.project(envelope.event.clone(), now).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(provider, event_id, event_type, error = %e, "Webhook processing failed");
                return Err(e);
            }
        };

        // 5. Record success
        let record = WebhookEventRecord::success(
            envelope.provider,
            event_id,
            event_type,
            envelope.payload.clone(),
            now,
        );
        if let SaveResult::AlreadyExists = self.ledger.save(record).await? {
            tracing::debug!(provider, event_id, "Concurrent delivery already recorded");
        }

        tracing::info!(
            provider,
            event_id,
            event_type,
            event = envelope.event.name(),
            rows_written = report.rows_written,
            stale = report.stale,
            "Webhook processed"
        );

        Ok(ProcessWebhookResult::Processed {
            event_id: envelope.event_id.clone(),
            report,
        })
    }
}
