//! Razorpay webhook payloads.
//!
//! Razorpay wraps every entity as `payload.<entity>.entity`. The envelope is
//! decoded loosely so that unknown event types never fail on entity shape;
//! only the entities a recognized event needs are decoded strictly.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::payment_event::PaymentEvent;
use super::webhook_errors::WebhookError;
use crate::domain::billing::{
    OrderMetadata, OrderSnapshot, PaymentProvider, PaymentSnapshot, RefundSnapshot,
    SubscriptionSnapshot,
};
use crate::domain::foundation::Timestamp;

/// Razorpay webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayEvent {
    /// Event type (e.g. `payment.captured`).
    pub event: String,

    #[serde(default)]
    pub account_id: Option<String>,

    /// Entities carried by the event, keyed by entity name.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Unix timestamp the event was generated.
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EntityWrapper<T> {
    entity: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub fee: Option<i64>,
    #[serde(default)]
    pub tax: Option<i64>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    /// Checkout notes; Razorpay sends `[]` when empty.
    #[serde(default)]
    pub notes: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpaySubscription {
    pub id: String,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub current_start: Option<i64>,
    #[serde(default)]
    pub current_end: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub paid_count: Option<i32>,
    #[serde(default)]
    pub remaining_count: Option<i32>,
    #[serde(default)]
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub notes: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl RazorpayEvent {
    /// Decodes the event into its provider-neutral form.
    ///
    /// # Errors
    ///
    /// `MissingField` when a recognized event lacks the entity it needs,
    /// `ParseError` when that entity is malformed.
    pub fn to_payment_event(&self) -> Result<PaymentEvent, WebhookError> {
        let event = match self.event.as_str() {
            "payment.authorized" => PaymentEvent::PaymentAuthorized {
                payment: self.payment()?.into_snapshot(None),
            },
            "payment.captured" => {
                let payment = self.payment()?;
                let metadata = OrderMetadata::from_value(&payment.notes);
                PaymentEvent::PaymentCaptured {
                    payment: payment.into_snapshot(None),
                    metadata,
                }
            }
            "payment.failed" => PaymentEvent::PaymentFailed {
                payment: self.payment()?.into_snapshot(None),
            },
            "order.paid" => {
                let order: RazorpayOrder = self.entity("order", "payload.order")?;
                let payment_id = self
                    .optional_entity::<RazorpayPayment>("payment")?
                    .map(|payment| payment.id);
                PaymentEvent::OrderPaid {
                    order: order.into_snapshot(),
                    payment_id,
                }
            }
            "subscription.activated" => PaymentEvent::SubscriptionActivated {
                subscription: self.subscription()?.into_snapshot(),
            },
            "subscription.charged" => {
                let subscription = self.subscription()?;
                let payment = self
                    .optional_entity::<RazorpayPayment>("payment")?
                    .map(|payment| payment.into_snapshot(Some(subscription.id.clone())));
                PaymentEvent::SubscriptionCharged {
                    subscription: subscription.into_snapshot(),
                    payment,
                }
            }
            "subscription.cancelled" => PaymentEvent::SubscriptionCancelled {
                subscription: self.subscription()?.into_snapshot(),
            },
            "subscription.completed" => PaymentEvent::SubscriptionCompleted {
                subscription: self.subscription()?.into_snapshot(),
            },
            "refund.created" => PaymentEvent::RefundCreated {
                refund: self.refund()?.into_snapshot(),
            },
            "refund.processed" => PaymentEvent::RefundProcessed {
                refunds: vec![self.refund()?.into_snapshot()],
            },
            "refund.failed" => PaymentEvent::RefundFailed {
                refund: self.refund()?.into_snapshot(),
            },
            other => PaymentEvent::Unrecognized {
                event_type: other.to_string(),
            },
        };
        Ok(event)
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at.and_then(Timestamp::from_unix_secs)
    }

    fn payment(&self) -> Result<RazorpayPayment, WebhookError> {
        self.entity("payment", "payload.payment")
    }

    fn subscription(&self) -> Result<RazorpaySubscription, WebhookError> {
        self.entity("subscription", "payload.subscription")
    }

    fn refund(&self) -> Result<RazorpayRefund, WebhookError> {
        self.entity("refund", "payload.refund")
    }

    fn entity<T: DeserializeOwned>(
        &self,
        key: &str,
        field: &'static str,
    ) -> Result<T, WebhookError> {
        self.optional_entity(key)?
            .ok_or(WebhookError::MissingField(field))
    }

    fn optional_entity<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WebhookError> {
        match self.payload.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value::<EntityWrapper<T>>(value.clone())
                .map(|wrapper| Some(wrapper.entity))
                .map_err(|e| WebhookError::ParseError(format!("payload.{}: {}", key, e))),
        }
    }
}

impl RazorpayPayment {
    fn into_snapshot(self, subscription_id: Option<String>) -> PaymentSnapshot {
        PaymentSnapshot {
            id: self.id,
            provider: PaymentProvider::Razorpay,
            order_id: self.order_id,
            subscription_id,
            amount_minor: self.amount,
            currency: self.currency,
            method: self.method,
            fee_minor: self.fee,
            tax_minor: self.tax,
            error_code: self.error_code,
            error_description: self.error_description,
            created_at: self.created_at.and_then(Timestamp::from_unix_secs),
        }
    }
}

impl RazorpayOrder {
    fn into_snapshot(self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id,
            amount_minor: self.amount,
            currency: self.currency,
            receipt: self.receipt,
            metadata: OrderMetadata::from_value(&self.notes),
            created_at: self.created_at.and_then(Timestamp::from_unix_secs),
        }
    }
}

impl RazorpaySubscription {
    fn into_snapshot(self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            user_id: OrderMetadata::from_value(&self.notes).user_id,
            id: self.id,
            provider: PaymentProvider::Razorpay,
            plan_id: self.plan_id,
            current_start: self.current_start.and_then(Timestamp::from_unix_secs),
            current_end: self.current_end.and_then(Timestamp::from_unix_secs),
            ended_at: self.ended_at.and_then(Timestamp::from_unix_secs),
            paid_count: self.paid_count,
            remaining_count: self.remaining_count,
        }
    }
}

impl RazorpayRefund {
    fn into_snapshot(self) -> RefundSnapshot {
        RefundSnapshot {
            id: self.id,
            payment_id: self.payment_id,
            amount_minor: self.amount,
            currency: self.currency,
            notes: match self.notes {
                serde_json::Value::Object(_) => self.notes,
                _ => serde_json::json!({}),
            },
            created_at: self.created_at.and_then(Timestamp::from_unix_secs),
        }
    }
}
