//! Recurring subscription mirrored from the provider.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::projection::Projection;
use super::provider::PaymentProvider;
use crate::domain::foundation::{StateMachine, Timestamp, Transition, ValidationError};

/// Subscription lifecycle. `Cancelled` and `Completed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Created,
    Active,
    PastDue,
    Paused,
    Cancelled,
    Completed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Created => "created",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Completed => "completed",
        }
    }

    /// Maps a provider-reported status string onto the local lifecycle.
    pub fn from_provider(provider: PaymentProvider, raw: &str) -> Option<Self> {
        use SubscriptionStatus::*;
        match provider {
            PaymentProvider::Razorpay => match raw {
                "created" | "authenticated" => Some(Created),
                "active" => Some(Active),
                "pending" | "halted" => Some(PastDue),
                "paused" => Some(Paused),
                "cancelled" => Some(Cancelled),
                "completed" | "expired" => Some(Completed),
                _ => None,
            },
            PaymentProvider::Stripe => match raw {
                "incomplete" => Some(Created),
                "trialing" | "active" => Some(Active),
                "past_due" | "unpaid" => Some(PastDue),
                "paused" => Some(Paused),
                "canceled" | "incomplete_expired" => Some(Cancelled),
                _ => None,
            },
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SubscriptionStatus::*;
        match s {
            "created" => Ok(Created),
            "active" => Ok(Active),
            "past_due" => Ok(PastDue),
            "paused" => Ok(Paused),
            "cancelled" => Ok(Cancelled),
            "completed" => Ok(Completed),
            other => Err(ValidationError::invalid_format(
                "subscription.status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        match self {
            Cancelled | Completed => false,
            Created => *target != Created,
            Active | PastDue | Paused => *target != Created && target != self,
        }
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        [Created, Active, PastDue, Paused, Cancelled, Completed]
            .into_iter()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }
}

/// Subscription fields as reported in a lifecycle webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub provider: PaymentProvider,
    pub user_id: Option<String>,
    pub plan_id: Option<String>,
    pub current_start: Option<Timestamp>,
    pub current_end: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub paid_count: Option<i32>,
    pub remaining_count: Option<i32>,
}

/// Persisted subscription row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub provider: PaymentProvider,
    pub user_id: Option<String>,
    pub plan_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_start: Option<Timestamp>,
    pub current_end: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub paid_count: i32,
    pub remaining_count: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn from_snapshot(
        snapshot: SubscriptionSnapshot,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            id: snapshot.id,
            provider: snapshot.provider,
            user_id: snapshot.user_id,
            plan_id: snapshot.plan_id,
            status,
            current_start: snapshot.current_start,
            current_end: snapshot.current_end,
            ended_at: snapshot.ended_at,
            paid_count: snapshot.paid_count.unwrap_or(0),
            remaining_count: snapshot.remaining_count,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges a lifecycle snapshot into the stored row.
    ///
    /// Counters and billing periods only move forward, so a `charged` event
    /// delivered after `cancelled` still records the charge while the
    /// terminal status is kept. The event is `Stale` only when it carries
    /// nothing newer at all.
    pub fn project(
        existing: Option<&Subscription>,
        snapshot: SubscriptionSnapshot,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Projection<Subscription> {
        let Some(current) = existing else {
            return Projection::Write(Subscription::from_snapshot(snapshot, status, now));
        };

        let transition = current.status.advance(status);

        let mut next = current.clone();
        if let Transition::Advanced(target) = transition {
            next.status = target;
        }
        next.user_id = next.user_id.or(snapshot.user_id);
        next.plan_id = next.plan_id.or(snapshot.plan_id);
        next.current_start = later(next.current_start, snapshot.current_start);
        next.current_end = later(next.current_end, snapshot.current_end);
        next.ended_at = next.ended_at.or(snapshot.ended_at);
        if let Some(paid) = snapshot.paid_count {
            next.paid_count = next.paid_count.max(paid);
        }
        next.remaining_count = match (next.remaining_count, snapshot.remaining_count) {
            (Some(stored), Some(incoming)) => Some(stored.min(incoming)),
            (stored, incoming) => stored.or(incoming),
        };

        if next == *current {
            match transition {
                Transition::Stale { current, incoming } => Projection::Stale {
                    current: current.as_str(),
                    incoming: incoming.as_str(),
                },
                _ => Projection::NoChange,
            }
        } else {
            next.updated_at = now;
            Projection::Write(next)
        }
    }
}

fn later(stored: Option<Timestamp>, incoming: Option<Timestamp>) -> Option<Timestamp> {
    match (stored, incoming) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
