//! Stripe webhook event types.
//!
//! Defines the structures for parsing Stripe webhook payloads.
//! Only fields relevant to our processing are captured.

use serde::{Deserialize, Serialize};

use super::payment_event::PaymentEvent;
use super::webhook_errors::WebhookError;
use crate::domain::billing::{
    OrderMetadata, PaymentProvider, PaymentSnapshot, RefundSnapshot, SubscriptionSnapshot,
    SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;

/// Stripe webhook event (simplified).
///
/// Contains the essential fields needed for webhook processing.
/// Additional fields from Stripe's full event schema are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_received: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
    #[serde(default)]
    pub last_payment_error: Option<StripePaymentError>,
    #[serde(default)]
    pub created: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub items: serde_json::Value,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub refunds: Option<StripeList<StripeRefund>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// `pending`, `requires_action`, `succeeded`, `failed` or `canceled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub charge: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    pub currency: String,
    #[serde(default)]
    pub lines: serde_json::Value,
    /// Copy of the subscription's metadata at invoice time.
    #[serde(default)]
    pub subscription_details: serde_json::Value,
    #[serde(default)]
    pub status_transitions: serde_json::Value,
    #[serde(default)]
    pub created: Option<i64>,
}

impl StripeEvent {
    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::ParseError(format!("data.object: {}", e)))
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        Timestamp::from_unix_secs(self.created)
    }

    /// Decodes the event into its provider-neutral form.
    pub fn to_payment_event(&self) -> Result<PaymentEvent, WebhookError> {
        let event = match self.event_type.as_str() {
            "payment_intent.succeeded" => {
                let intent: StripePaymentIntent = self.deserialize_object()?;
                let metadata = OrderMetadata::from_value(&intent.metadata);
                PaymentEvent::PaymentCaptured {
                    payment: intent.into_snapshot(&metadata),
                    metadata,
                }
            }
            "payment_intent.payment_failed" => {
                let intent: StripePaymentIntent = self.deserialize_object()?;
                let metadata = OrderMetadata::from_value(&intent.metadata);
                PaymentEvent::PaymentFailed {
                    payment: intent.into_snapshot(&metadata),
                }
            }
            "payment_intent.canceled" => {
                let intent: StripePaymentIntent = self.deserialize_object()?;
                let metadata = OrderMetadata::from_value(&intent.metadata);
                PaymentEvent::PaymentCancelled {
                    payment: intent.into_snapshot(&metadata),
                }
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription: StripeSubscription = self.deserialize_object()?;
                let status =
                    SubscriptionStatus::from_provider(PaymentProvider::Stripe, &subscription.status)
                        .ok_or_else(|| {
                            WebhookError::ParseError(format!(
                                "unknown subscription status '{}'",
                                subscription.status
                            ))
                        })?;
                PaymentEvent::SubscriptionUpdated {
                    subscription: subscription.into_snapshot(),
                    status,
                }
            }
            "customer.subscription.deleted" => {
                let subscription: StripeSubscription = self.deserialize_object()?;
                PaymentEvent::SubscriptionCancelled {
                    subscription: subscription.into_snapshot(),
                }
            }
            "invoice.payment_succeeded" => {
                let invoice: StripeInvoice = self.deserialize_object()?;
                match invoice.subscription.clone() {
                    Some(subscription_id) => PaymentEvent::SubscriptionCharged {
                        payment: invoice.payment_snapshot(&subscription_id),
                        subscription: invoice.into_subscription_snapshot(subscription_id),
                    },
                    // One-off invoices settle through payment_intent.succeeded.
                    None => PaymentEvent::Unrecognized {
                        event_type: self.event_type.clone(),
                    },
                }
            }
            "invoice.payment_failed" => {
                let invoice: StripeInvoice = self.deserialize_object()?;
                match invoice.subscription.clone() {
                    Some(subscription_id) => PaymentEvent::SubscriptionUpdated {
                        subscription: invoice.into_subscription_snapshot(subscription_id),
                        status: SubscriptionStatus::PastDue,
                    },
                    None => PaymentEvent::Unrecognized {
                        event_type: self.event_type.clone(),
                    },
                }
            }
            "charge.refunded" => {
                let charge: StripeCharge = self.deserialize_object()?;
                PaymentEvent::RefundProcessed {
                    refunds: charge.into_refund_snapshots()?,
                }
            }
            "refund.created" | "refund.updated" | "charge.refund.updated" => {
                let refund: StripeRefund = self.deserialize_object()?;
                refund.into_payment_event()?
            }
            "refund.failed" => {
                let refund: StripeRefund = self.deserialize_object()?;
                PaymentEvent::RefundFailed {
                    refund: refund.into_snapshot(None)?,
                }
            }
            other => PaymentEvent::Unrecognized {
                event_type: other.to_string(),
            },
        };
        Ok(event)
    }
}

impl StripePaymentIntent {
    fn into_snapshot(self, metadata: &OrderMetadata) -> PaymentSnapshot {
        let (error_code, error_description) = match self.last_payment_error {
            Some(error) => (error.code.or(error.decline_code), error.message),
            None => (None, None),
        };
        PaymentSnapshot {
            id: self.id,
            provider: PaymentProvider::Stripe,
            order_id: metadata.order_id.clone(),
            subscription_id: None,
            amount_minor: self.amount_received.filter(|v| *v > 0).unwrap_or(self.amount),
            currency: self.currency.to_uppercase(),
            method: self.payment_method_types.into_iter().next(),
            fee_minor: None,
            tax_minor: None,
            error_code,
            error_description,
            created_at: self.created.and_then(Timestamp::from_unix_secs),
        }
    }
}

impl StripeSubscription {
    fn into_snapshot(self) -> SubscriptionSnapshot {
        let plan_id = self
            .items
            .pointer("/data/0/price/id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        SubscriptionSnapshot {
            user_id: OrderMetadata::from_value(&self.metadata).user_id,
            id: self.id,
            provider: PaymentProvider::Stripe,
            plan_id,
            current_start: self.current_period_start.and_then(Timestamp::from_unix_secs),
            current_end: self.current_period_end.and_then(Timestamp::from_unix_secs),
            ended_at: self.ended_at.and_then(Timestamp::from_unix_secs),
            paid_count: None,
            remaining_count: None,
        }
    }
}

impl StripeInvoice {
    /// The renewal payment, when the invoice was paid through an intent.
    fn payment_snapshot(&self, subscription_id: &str) -> Option<PaymentSnapshot> {
        let payment_intent = self.payment_intent.clone()?;
        let paid_at = self
            .status_transitions
            .get("paid_at")
            .and_then(|v| v.as_i64())
            .or(self.created);
        Some(PaymentSnapshot {
            id: payment_intent,
            provider: PaymentProvider::Stripe,
            order_id: None,
            subscription_id: Some(subscription_id.to_string()),
            amount_minor: self.amount_paid,
            currency: self.currency.to_uppercase(),
            method: None,
            fee_minor: None,
            tax_minor: None,
            error_code: None,
            error_description: None,
            created_at: paid_at.and_then(Timestamp::from_unix_secs),
        })
    }

    fn into_subscription_snapshot(self, subscription_id: String) -> SubscriptionSnapshot {
        let line = self.lines.pointer("/data/0");
        let period = |field: &str| {
            line.and_then(|l| l.pointer(&format!("/period/{}", field)))
                .and_then(|v| v.as_i64())
                .and_then(Timestamp::from_unix_secs)
        };
        let metadata = self
            .subscription_details
            .get("metadata")
            .cloned()
            .unwrap_or_default();
        SubscriptionSnapshot {
            id: subscription_id,
            provider: PaymentProvider::Stripe,
            user_id: OrderMetadata::from_value(&metadata).user_id,
            plan_id: line
                .and_then(|l| l.pointer("/price/id"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            current_start: period("start"),
            current_end: period("end"),
            ended_at: None,
            paid_count: None,
            remaining_count: None,
        }
    }
}

impl StripeCharge {
    /// Refunds listed on the charge.
    ///
    /// Newer API versions no longer embed the list; such events fail with
    /// `MissingField` so they are never recorded as handled.
    fn into_refund_snapshots(self) -> Result<Vec<RefundSnapshot>, WebhookError> {
        let refunds = self
            .refunds
            .map(|list| list.data)
            .filter(|data| !data.is_empty())
            .ok_or(WebhookError::MissingField("data.object.refunds"))?;
        let payment_id = self.payment_intent.unwrap_or(self.id);
        refunds
            .into_iter()
            .map(|refund| refund.into_snapshot(Some(&payment_id)))
            .collect()
    }
}

impl StripeRefund {
    /// Classifies a standalone refund object by its status.
    fn into_payment_event(self) -> Result<PaymentEvent, WebhookError> {
        let status = self.status.clone();
        let event = match status.as_deref() {
            None | Some("pending") | Some("requires_action") => PaymentEvent::RefundCreated {
                refund: self.into_snapshot(None)?,
            },
            Some("succeeded") => PaymentEvent::RefundProcessed {
                refunds: vec![self.into_snapshot(None)?],
            },
            Some("failed") | Some("canceled") => PaymentEvent::RefundFailed {
                refund: self.into_snapshot(None)?,
            },
            Some(other) => {
                return Err(WebhookError::ParseError(format!(
                    "unknown refund status '{}'",
                    other
                )))
            }
        };
        Ok(event)
    }

    fn into_snapshot(self, charge_payment: Option<&str>) -> Result<RefundSnapshot, WebhookError> {
        let payment_id = match charge_payment {
            Some(id) => id.to_string(),
            None => self
                .payment_intent
                .or(self.charge)
                .ok_or(WebhookError::MissingField("data.object.payment_intent"))?,
        };
        Ok(RefundSnapshot {
            id: self.id,
            payment_id,
            amount_minor: self.amount,
            currency: self.currency.to_uppercase(),
            notes: match self.metadata {
                serde_json::Value::Object(_) => self.metadata,
                _ => serde_json::json!({}),
            },
            created_at: self.created.and_then(Timestamp::from_unix_secs),
        })
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "payment_intent.succeeded".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: StripeEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: false,
            api_version: Some("2023-10-16".to_string()),
        }
    }

    pub fn to_json(self) -> String {
        serde_json::to_string(&self.build()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::FulfillmentTarget;
    use serde_json::json;

    fn intent() -> serde_json::Value {
        json!({
            "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
            "object": "payment_intent",
            "amount": 2000,
            "amount_received": 2000,
            "currency": "usd",
            "payment_method_types": ["card"],
            "metadata": {
                "type": "generation",
                "generationId": "gen_1",
                "userId": "user_1",
                "orderId": "order_1"
            },
            "created": 1_680_800_504
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Payment Intent Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn succeeded_intent_becomes_capture_with_metadata() {
        let event = StripeEventBuilder::new().object(intent()).build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::PaymentCaptured { payment, metadata } => {
                assert_eq!(payment.id, "pi_3MtwBwLkdIwHu7ix28a3tqPa");
                assert_eq!(payment.currency, "USD");
                assert_eq!(payment.method.as_deref(), Some("card"));
                assert_eq!(payment.order_id.as_deref(), Some("order_1"));
                assert_eq!(
                    metadata.fulfillment_target(),
                    Some(FulfillmentTarget::Generation {
                        generation_id: "gen_1".to_string()
                    })
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn failed_intent_carries_last_payment_error() {
        let mut object = intent();
        object["amount_received"] = json!(0);
        object["last_payment_error"] = json!({
            "code": "card_declined",
            "message": "Your card was declined."
        });
        let event = StripeEventBuilder::new()
            .event_type("payment_intent.payment_failed")
            .object(object)
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::PaymentFailed { payment } => {
                assert_eq!(payment.amount_minor, 2000);
                assert_eq!(payment.error_code.as_deref(), Some("card_declined"));
                assert_eq!(
                    payment.error_description.as_deref(),
                    Some("Your card was declined.")
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn canceled_intent_becomes_cancellation() {
        let event = StripeEventBuilder::new()
            .event_type("payment_intent.canceled")
            .object(intent())
            .build();

        assert!(matches!(
            event.to_payment_event().unwrap(),
            PaymentEvent::PaymentCancelled { .. }
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription and Refund Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_update_maps_provider_status() {
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.updated")
            .object(json!({
                "id": "sub_1",
                "status": "past_due",
                "metadata": {"userId": "user_1"},
                "items": {"data": [{"price": {"id": "price_pro"}}]},
                "current_period_start": 1_700_000_000,
                "current_period_end": 1_702_592_000
            }))
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::SubscriptionUpdated {
                subscription,
                status,
            } => {
                assert_eq!(status, SubscriptionStatus::PastDue);
                assert_eq!(subscription.plan_id.as_deref(), Some("price_pro"));
                assert_eq!(subscription.user_id.as_deref(), Some("user_1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn subscription_with_unknown_status_is_parse_error() {
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.created")
            .object(json!({"id": "sub_1", "status": "levitating"}))
            .build();

        assert!(matches!(
            event.to_payment_event(),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn charge_refunded_yields_every_refund() {
        let event = StripeEventBuilder::new()
            .event_type("charge.refunded")
            .object(json!({
                "id": "ch_1",
                "payment_intent": "pi_1",
                "refunds": {"data": [
                    {"id": "re_1", "amount": 500, "currency": "usd"},
                    {"id": "re_2", "amount": 700, "currency": "usd", "metadata": {"reason": "late"}}
                ]}
            }))
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::RefundProcessed { refunds } => {
                assert_eq!(refunds.len(), 2);
                assert!(refunds.iter().all(|r| r.payment_id == "pi_1"));
                assert_eq!(refunds[0].notes, json!({}));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn charge_refunded_without_refund_list_is_missing_field() {
        let event = StripeEventBuilder::new()
            .event_type("charge.refunded")
            .object(json!({
                "id": "ch_1",
                "payment_intent": "pi_1",
                "amount_refunded": 4999
            }))
            .build();

        assert!(matches!(
            event.to_payment_event(),
            Err(WebhookError::MissingField("data.object.refunds"))
        ));
    }

    fn refund_object(status: &str) -> serde_json::Value {
        json!({
            "id": "re_3NG8Du2eZvKYlo2C1x5XQRmE",
            "object": "refund",
            "amount": 4999,
            "currency": "usd",
            "status": status,
            "payment_intent": "pi_1",
            "charge": "ch_1",
            "metadata": {"reason": "duplicate"},
            "created": 1_700_000_100
        })
    }

    #[test]
    fn refund_object_events_follow_refund_status() {
        let cases = [
            ("refund.created", "pending", "refund_created"),
            ("refund.updated", "succeeded", "refund_processed"),
            ("charge.refund.updated", "succeeded", "refund_processed"),
            ("refund.updated", "canceled", "refund_failed"),
            ("refund.failed", "failed", "refund_failed"),
        ];

        for (event_type, status, expected) in cases {
            let event = StripeEventBuilder::new()
                .event_type(event_type)
                .object(refund_object(status))
                .build();

            let decoded = event.to_payment_event().unwrap();
            assert_eq!(decoded.name(), expected, "{} with {}", event_type, status);
        }
    }

    #[test]
    fn refund_object_is_keyed_to_its_payment_intent() {
        let event = StripeEventBuilder::new()
            .event_type("refund.updated")
            .object(refund_object("succeeded"))
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::RefundProcessed { refunds } => {
                assert_eq!(refunds[0].id, "re_3NG8Du2eZvKYlo2C1x5XQRmE");
                assert_eq!(refunds[0].payment_id, "pi_1");
                assert_eq!(refunds[0].currency, "USD");
                assert_eq!(refunds[0].notes, json!({"reason": "duplicate"}));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn refund_without_payment_reference_is_missing_field() {
        let mut object = refund_object("pending");
        object["payment_intent"] = serde_json::Value::Null;
        object["charge"] = serde_json::Value::Null;
        let event = StripeEventBuilder::new()
            .event_type("refund.created")
            .object(object)
            .build();

        assert!(matches!(
            event.to_payment_event(),
            Err(WebhookError::MissingField(_))
        ));
    }

    fn invoice() -> serde_json::Value {
        json!({
            "id": "in_1NG8Du2eZvKYlo2C",
            "object": "invoice",
            "subscription": "sub_1",
            "payment_intent": "pi_renewal_1",
            "amount_paid": 1500,
            "currency": "usd",
            "subscription_details": {"metadata": {"userId": "user_1"}},
            "lines": {"data": [{
                "price": {"id": "price_pro"},
                "period": {"start": 1_700_000_000, "end": 1_702_592_000}
            }]},
            "status_transitions": {"paid_at": 1_700_000_050},
            "created": 1_700_000_000
        })
    }

    #[test]
    fn paid_subscription_invoice_is_a_charge_with_payment() {
        let event = StripeEventBuilder::new()
            .event_type("invoice.payment_succeeded")
            .object(invoice())
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::SubscriptionCharged {
                subscription,
                payment,
            } => {
                assert_eq!(subscription.id, "sub_1");
                assert_eq!(subscription.plan_id.as_deref(), Some("price_pro"));
                assert_eq!(subscription.user_id.as_deref(), Some("user_1"));
                assert_eq!(
                    subscription.current_end,
                    Timestamp::from_unix_secs(1_702_592_000)
                );
                let payment = payment.unwrap();
                assert_eq!(payment.id, "pi_renewal_1");
                assert_eq!(payment.amount_minor, 1500);
                assert_eq!(payment.currency, "USD");
                assert_eq!(payment.subscription_id.as_deref(), Some("sub_1"));
                assert_eq!(payment.created_at, Timestamp::from_unix_secs(1_700_000_050));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn failed_subscription_invoice_marks_past_due() {
        let event = StripeEventBuilder::new()
            .event_type("invoice.payment_failed")
            .object(invoice())
            .build();

        match event.to_payment_event().unwrap() {
            PaymentEvent::SubscriptionUpdated {
                subscription,
                status,
            } => {
                assert_eq!(subscription.id, "sub_1");
                assert_eq!(status, SubscriptionStatus::PastDue);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn invoice_without_subscription_is_unrecognized() {
        let mut object = invoice();
        object["subscription"] = serde_json::Value::Null;
        let event = StripeEventBuilder::new()
            .event_type("invoice.payment_succeeded")
            .object(object)
            .build();

        assert_eq!(
            event.to_payment_event().unwrap(),
            PaymentEvent::Unrecognized {
                event_type: "invoice.payment_succeeded".to_string()
            }
        );
    }

    #[test]
    fn malformed_intent_is_parse_error() {
        let event = StripeEventBuilder::new()
            .object(json!({"id": "pi_1"}))
            .build();

        assert!(matches!(
            event.to_payment_event(),
            Err(WebhookError::ParseError(_))
        ));
    }
}
