//! Provider-neutral payment event, decoded once at the webhook boundary.

use crate::domain::billing::{
    OrderMetadata, OrderSnapshot, PaymentProvider, PaymentSnapshot, RefundSnapshot,
    SubscriptionSnapshot, SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;

/// Every event the projection pipeline understands.
///
/// Provider payloads are decoded into this type exactly once; handlers match
/// on it exhaustively. Anything a provider sends that is not listed here is
/// `Unrecognized` and acknowledged without touching storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    PaymentAuthorized {
        payment: PaymentSnapshot,
    },
    /// Capture. `metadata` is whatever the provider echoed inline (Stripe
    /// intent metadata, Razorpay payment notes) and may be empty, in which
    /// case fulfillment falls back to the stored order.
    PaymentCaptured {
        payment: PaymentSnapshot,
        metadata: OrderMetadata,
    },
    PaymentFailed {
        payment: PaymentSnapshot,
    },
    PaymentCancelled {
        payment: PaymentSnapshot,
    },
    OrderPaid {
        order: OrderSnapshot,
        payment_id: Option<String>,
    },
    SubscriptionActivated {
        subscription: SubscriptionSnapshot,
    },
    SubscriptionCharged {
        subscription: SubscriptionSnapshot,
        payment: Option<PaymentSnapshot>,
    },
    /// Generic lifecycle change carrying the provider-reported status.
    SubscriptionUpdated {
        subscription: SubscriptionSnapshot,
        status: SubscriptionStatus,
    },
    SubscriptionCancelled {
        subscription: SubscriptionSnapshot,
    },
    SubscriptionCompleted {
        subscription: SubscriptionSnapshot,
    },
    RefundCreated {
        refund: RefundSnapshot,
    },
    RefundProcessed {
        refunds: Vec<RefundSnapshot>,
    },
    RefundFailed {
        refund: RefundSnapshot,
    },
    Unrecognized {
        event_type: String,
    },
}

impl PaymentEvent {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentAuthorized { .. } => "payment_authorized",
            PaymentEvent::PaymentCaptured { .. } => "payment_captured",
            PaymentEvent::PaymentFailed { .. } => "payment_failed",
            PaymentEvent::PaymentCancelled { .. } => "payment_cancelled",
            PaymentEvent::OrderPaid { .. } => "order_paid",
            PaymentEvent::SubscriptionActivated { .. } => "subscription_activated",
            PaymentEvent::SubscriptionCharged { .. } => "subscription_charged",
            PaymentEvent::SubscriptionUpdated { .. } => "subscription_updated",
            PaymentEvent::SubscriptionCancelled { .. } => "subscription_cancelled",
            PaymentEvent::SubscriptionCompleted { .. } => "subscription_completed",
            PaymentEvent::RefundCreated { .. } => "refund_created",
            PaymentEvent::RefundProcessed { .. } => "refund_processed",
            PaymentEvent::RefundFailed { .. } => "refund_failed",
            PaymentEvent::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, PaymentEvent::Unrecognized { .. })
    }
}

/// An authenticated, decoded webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    pub provider: PaymentProvider,
    /// Provider event id, used as the idempotency key.
    pub event_id: String,
    /// Raw provider event type string (`payment.captured`, ...).
    pub event_type: String,
    pub created_at: Option<Timestamp>,
    /// Parsed body kept for the idempotency ledger.
    pub payload: serde_json::Value,
    pub event: PaymentEvent,
}
