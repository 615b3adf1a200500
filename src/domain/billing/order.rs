//! Checkout order and the metadata that drives fulfillment.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::entitlement::FulfillmentTarget;
use super::projection::Projection;
use crate::domain::foundation::{StateMachine, Timestamp, Transition, ValidationError};

/// Order lifecycle. A failed attempt can still be followed by a successful
/// payment on the same order; `Paid` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Razorpay reports "attempted" for orders with a pending payment.
            "created" | "attempted" => Ok(OrderStatus::Created),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "order.status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Created, Paid) | (Created, Failed) | (Failed, Paid)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Created => vec![Paid, Failed],
            Failed => vec![Paid],
            Paid => vec![],
        }
    }
}

/// Opaque metadata attached at checkout and echoed back by the provider.
///
/// Field names follow the checkout payload (`licenseId`, `generationId`,
/// `userId`); snake_case spellings are accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderMetadata {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "licenseId", alias = "license_id", skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(
        rename = "generationId",
        alias = "generation_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_id: Option<String>,
    #[serde(rename = "userId", alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "orderId", alias = "order_id", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl OrderMetadata {
    /// Decodes provider-supplied notes/metadata, tolerating any shape.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Resolves the metadata tag to a fulfillment target.
    pub fn fulfillment_target(&self) -> Option<FulfillmentTarget> {
        match self.kind.as_deref() {
            Some("license") => self
                .license_id
                .clone()
                .map(|license_id| FulfillmentTarget::License { license_id }),
            Some("generation") => self
                .generation_id
                .clone()
                .map(|generation_id| FulfillmentTarget::Generation { generation_id }),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == OrderMetadata::default()
    }
}

/// Order fields reported in an `order.paid` webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub metadata: OrderMetadata,
    pub created_at: Option<Timestamp>,
}

/// Persisted order row (`payment_orders`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub metadata: OrderMetadata,
    pub receipt: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates the order recorded when a checkout is initiated.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        metadata: OrderMetadata,
        receipt: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: Some(user_id.into()),
            amount_minor,
            currency: currency.into(),
            status: OrderStatus::Created,
            metadata,
            receipt,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the order paid, optionally linking the capturing payment.
    pub fn mark_paid(&self, payment_id: Option<&str>, now: Timestamp) -> Projection<Order> {
        self.move_to(OrderStatus::Paid, payment_id, now)
    }

    /// Marks the order failed after a failed payment attempt.
    pub fn mark_failed(&self, now: Timestamp) -> Projection<Order> {
        self.move_to(OrderStatus::Failed, None, now)
    }

    /// Projects an `order.paid` confirmation, creating the row if the
    /// checkout record never reached this datastore.
    pub fn project_paid(
        existing: Option<&Order>,
        snapshot: OrderSnapshot,
        now: Timestamp,
    ) -> Projection<Order> {
        match existing {
            Some(order) => order.mark_paid(None, now),
            None => Projection::Write(Order {
                id: snapshot.id,
                user_id: snapshot.metadata.user_id.clone(),
                amount_minor: snapshot.amount_minor,
                currency: snapshot.currency,
                status: OrderStatus::Paid,
                metadata: snapshot.metadata,
                receipt: snapshot.receipt,
                payment_id: None,
                created_at: snapshot.created_at.unwrap_or(now),
                updated_at: now,
            }),
        }
    }

    fn move_to(&self, target: OrderStatus, payment_id: Option<&str>, now: Timestamp) -> Projection<Order> {
        if let Transition::Stale { current, incoming } = self.status.advance(target) {
            return Projection::Stale {
                current: current.as_str(),
                incoming: incoming.as_str(),
            };
        }

        let mut next = self.clone();
        next.status = target;
        if let Some(payment_id) = payment_id {
            next.payment_id = Some(payment_id.to_string());
        }

        if next == *self {
            Projection::NoChange
        } else {
            next.updated_at = now;
            Projection::Write(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn license_order() -> Order {
        let metadata = OrderMetadata::from_value(&json!({
            "type": "license",
            "licenseId": "lic_42",
            "userId": "user_7"
        }));
        Order::new("order_1", "user_7", 99_900, "INR", metadata, Some("rcpt_1".into()), at(1))
    }

    // ══════════════════════════════════════════════════════════════
    // Metadata Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn license_metadata_resolves_to_license_target() {
        let target = license_order().metadata.fulfillment_target();
        assert_eq!(
            target,
            Some(FulfillmentTarget::License {
                license_id: "lic_42".to_string()
            })
        );
    }

    #[test]
    fn generation_metadata_accepts_snake_case() {
        let metadata = OrderMetadata::from_value(&json!({
            "type": "generation",
            "generation_id": "gen_3"
        }));

        assert_eq!(
            metadata.fulfillment_target(),
            Some(FulfillmentTarget::Generation {
                generation_id: "gen_3".to_string()
            })
        );
    }

    #[test]
    fn license_tag_without_id_needs_no_fulfillment() {
        let metadata = OrderMetadata::from_value(&json!({"type": "license"}));
        assert!(metadata.fulfillment_target().is_none());
    }

    #[test]
    fn subscription_metadata_needs_no_fulfillment() {
        let metadata = OrderMetadata::from_value(&json!({"type": "subscription", "userId": "u"}));
        assert!(metadata.fulfillment_target().is_none());
    }

    #[test]
    fn malformed_metadata_decodes_to_empty() {
        let metadata = OrderMetadata::from_value(&json!(["not", "an", "object"]));
        assert!(metadata.is_empty());
    }

    #[test]
    fn metadata_serializes_with_checkout_field_names() {
        let json = serde_json::to_value(&license_order().metadata).unwrap();
        assert_eq!(json["licenseId"], "lic_42");
        assert!(json.get("generationId").is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Status Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn mark_paid_links_payment() {
        let order = license_order().mark_paid(Some("pay_1"), at(5)).into_write().unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(order.updated_at, at(5));
    }

    #[test]
    fn mark_paid_twice_is_no_change() {
        let paid = license_order().mark_paid(Some("pay_1"), at(5)).into_write().unwrap();
        assert_eq!(paid.mark_paid(Some("pay_1"), at(9)), Projection::NoChange);
    }

    #[test]
    fn failed_order_can_still_be_paid() {
        let failed = license_order().mark_failed(at(5)).into_write().unwrap();

        let paid = failed.mark_paid(Some("pay_2"), at(6)).into_write().unwrap();

        assert_eq!(paid.status, OrderStatus::Paid);
    }

    #[test]
    fn paid_order_ignores_late_failure() {
        let paid = license_order().mark_paid(Some("pay_1"), at(5)).into_write().unwrap();

        assert_eq!(
            paid.mark_failed(at(6)),
            Projection::Stale {
                current: "paid",
                incoming: "failed"
            }
        );
    }

    #[test]
    fn attempted_parses_as_created() {
        assert_eq!("attempted".parse::<OrderStatus>(), Ok(OrderStatus::Created));
    }

    #[test]
    fn order_paid_for_unknown_order_creates_it() {
        let snapshot = OrderSnapshot {
            id: "order_9".to_string(),
            amount_minor: 100,
            currency: "INR".to_string(),
            receipt: None,
            metadata: OrderMetadata::from_value(&json!({"userId": "user_1"})),
            created_at: None,
        };

        let order = Order::project_paid(None, snapshot, at(3)).into_write().unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.user_id.as_deref(), Some("user_1"));
        assert_eq!(order.created_at, at(3));
    }
}
