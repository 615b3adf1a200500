//! Payment entity and its forward-only status machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::projection::Projection;
use super::provider::PaymentProvider;
use crate::domain::foundation::{StateMachine, Timestamp, Transition, ValidationError};

/// Lifecycle of a single payment attempt.
///
/// `Captured` and `Cancelled` are terminal. `Failed` is not: Stripe keeps
/// the same PaymentIntent id across a declined card and the retry that
/// succeeds, so a failed payment may still be captured or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Authorized,
    Captured,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorized" => Ok(PaymentStatus::Authorized),
            "captured" => Ok(PaymentStatus::Captured),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "payment.status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Authorized, Captured)
                | (Authorized, Failed)
                | (Authorized, Cancelled)
                | (Failed, Captured)
                | (Failed, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Authorized => vec![Captured, Failed, Cancelled],
            Failed => vec![Captured, Cancelled],
            Captured | Cancelled => vec![],
        }
    }
}

/// Payment fields as reported by the provider in a webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub id: String,
    pub provider: PaymentProvider,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Amount in the currency's minor unit (paise, cents).
    pub amount_minor: i64,
    pub currency: String,
    pub method: Option<String>,
    pub fee_minor: Option<i64>,
    pub tax_minor: Option<i64>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub created_at: Option<Timestamp>,
}

/// Persisted payment row, keyed by the provider-issued id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub provider: PaymentProvider,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub fee_minor: i64,
    pub tax_minor: i64,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Builds a fresh row from a snapshot.
    pub fn from_snapshot(snapshot: PaymentSnapshot, status: PaymentStatus, now: Timestamp) -> Self {
        Self {
            id: snapshot.id,
            provider: snapshot.provider,
            order_id: snapshot.order_id,
            subscription_id: snapshot.subscription_id,
            amount_minor: snapshot.amount_minor,
            currency: snapshot.currency,
            status,
            method: snapshot.method,
            fee_minor: snapshot.fee_minor.unwrap_or(0),
            tax_minor: snapshot.tax_minor.unwrap_or(0),
            error_code: snapshot.error_code,
            error_description: snapshot.error_description,
            created_at: snapshot.created_at.unwrap_or(now),
            updated_at: now,
        }
    }

    /// Merges a provider snapshot into the stored row (if any).
    ///
    /// Replays produce `NoChange`; a status behind the stored one produces
    /// `Stale` and leaves the row untouched.
    pub fn project(
        existing: Option<&Payment>,
        snapshot: PaymentSnapshot,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Projection<Payment> {
        let Some(current) = existing else {
            return Projection::Write(Payment::from_snapshot(snapshot, status, now));
        };

        if let Transition::Stale { current, incoming } = current.status.advance(status) {
            return Projection::Stale {
                current: current.as_str(),
                incoming: incoming.as_str(),
            };
        }

        let mut next = current.clone();
        next.status = status;
        next.order_id = snapshot.order_id.or(next.order_id);
        next.subscription_id = snapshot.subscription_id.or(next.subscription_id);
        next.amount_minor = snapshot.amount_minor;
        next.currency = snapshot.currency;
        next.method = snapshot.method.or(next.method);
        next.fee_minor = snapshot.fee_minor.unwrap_or(next.fee_minor);
        next.tax_minor = snapshot.tax_minor.unwrap_or(next.tax_minor);
        if status == PaymentStatus::Failed {
            next.error_code = snapshot.error_code.or(next.error_code);
            next.error_description = snapshot.error_description.or(next.error_description);
        } else if current.status == PaymentStatus::Failed {
            next.error_code = None;
            next.error_description = None;
        }

        if next == *current {
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

    fn snapshot(id: &str) -> PaymentSnapshot {
        PaymentSnapshot {
            id: id.to_string(),
            provider: PaymentProvider::Razorpay,
            order_id: Some("order_1".to_string()),
            subscription_id: None,
            amount_minor: 50_000,
            currency: "INR".to_string(),
            method: Some("upi".to_string()),
            fee_minor: Some(1_180),
            tax_minor: Some(180),
            error_code: None,
            error_description: None,
            created_at: Timestamp::from_unix_secs(1_700_000_000),
        }
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Status Machine Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authorized_moves_to_every_terminal_state() {
        for target in [
            PaymentStatus::Captured,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert!(PaymentStatus::Authorized.can_transition_to(&target));
        }
    }

    #[test]
    fn terminal_states_do_not_move() {
        assert!(PaymentStatus::Captured.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
        assert!(!PaymentStatus::Captured.can_transition_to(&PaymentStatus::Authorized));
        assert!(!PaymentStatus::Captured.can_transition_to(&PaymentStatus::Failed));
    }

    #[test]
    fn failed_payment_can_still_be_captured() {
        assert!(!PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Failed.can_transition_to(&PaymentStatus::Captured));
        assert!(PaymentStatus::Failed.can_transition_to(&PaymentStatus::Cancelled));
        assert!(!PaymentStatus::Failed.can_transition_to(&PaymentStatus::Authorized));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            PaymentStatus::Authorized,
            PaymentStatus::Captured,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>(), Ok(status));
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Projection Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_payment_is_written_with_snapshot_fields() {
        let projection = Payment::project(None, snapshot("pay_1"), PaymentStatus::Authorized, at(10));

        let payment = projection.into_write().unwrap();
        assert_eq!(payment.id, "pay_1");
        assert_eq!(payment.status, PaymentStatus::Authorized);
        assert_eq!(payment.fee_minor, 1_180);
        assert_eq!(payment.created_at, at(1_700_000_000));
        assert_eq!(payment.updated_at, at(10));
    }

    #[test]
    fn capture_after_authorize_advances_status() {
        let stored = Payment::from_snapshot(snapshot("pay_1"), PaymentStatus::Authorized, at(10));

        let projection = Payment::project(Some(&stored), snapshot("pay_1"), PaymentStatus::Captured, at(20));

        let payment = projection.into_write().unwrap();
        assert_eq!(payment.status, PaymentStatus::Captured);
        assert_eq!(payment.updated_at, at(20));
    }

    #[test]
    fn replayed_capture_is_no_change() {
        let stored = Payment::from_snapshot(snapshot("pay_1"), PaymentStatus::Captured, at(10));

        let projection = Payment::project(Some(&stored), snapshot("pay_1"), PaymentStatus::Captured, at(99));

        assert_eq!(projection, Projection::NoChange);
    }

    #[test]
    fn late_authorize_after_capture_is_stale() {
        let stored = Payment::from_snapshot(snapshot("pay_1"), PaymentStatus::Captured, at(10));

        let projection = Payment::project(Some(&stored), snapshot("pay_1"), PaymentStatus::Authorized, at(20));

        assert_eq!(
            projection,
            Projection::Stale {
                current: "captured",
                incoming: "authorized"
            }
        );
    }

    #[test]
    fn failure_records_error_fields() {
        let stored = Payment::from_snapshot(snapshot("pay_1"), PaymentStatus::Authorized, at(10));
        let mut failed = snapshot("pay_1");
        failed.error_code = Some("BAD_REQUEST_ERROR".to_string());
        failed.error_description = Some("Payment declined by bank".to_string());

        let payment = Payment::project(Some(&stored), failed, PaymentStatus::Failed, at(20))
            .into_write()
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
        assert_eq!(
            payment.error_description.as_deref(),
            Some("Payment declined by bank")
        );
    }

    #[test]
    fn capture_after_decline_clears_error_fields() {
        let mut declined = snapshot("pi_retry");
        declined.error_code = Some("card_declined".to_string());
        declined.error_description = Some("Your card was declined.".to_string());
        let stored = Payment::from_snapshot(declined, PaymentStatus::Failed, at(10));

        let payment = Payment::project(Some(&stored), snapshot("pi_retry"), PaymentStatus::Captured, at(20))
            .into_write()
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Captured);
        assert!(payment.error_code.is_none());
        assert!(payment.error_description.is_none());
    }

    #[test]
    fn missing_snapshot_fields_keep_stored_values() {
        let stored = Payment::from_snapshot(snapshot("pay_1"), PaymentStatus::Authorized, at(10));
        let mut sparse = snapshot("pay_1");
        sparse.order_id = None;
        sparse.fee_minor = None;
        sparse.method = None;

        let payment = Payment::project(Some(&stored), sparse, PaymentStatus::Captured, at(20))
            .into_write()
            .unwrap();

        assert_eq!(payment.order_id.as_deref(), Some("order_1"));
        assert_eq!(payment.fee_minor, 1_180);
        assert_eq!(payment.method.as_deref(), Some("upi"));
    }
}
