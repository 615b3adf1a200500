use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::projection::Projection;
use crate::domain::foundation::{StateMachine, Timestamp, Transition, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Created,
    Processed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Created => "created",
            RefundStatus::Processed => "processed",
            RefundStatus::Failed => "failed",
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" | "pending" => Ok(RefundStatus::Created),
            "processed" | "succeeded" => Ok(RefundStatus::Processed),
            "failed" => Ok(RefundStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "refund.status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

impl StateMachine for RefundStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RefundStatus::*;
        matches!((self, target), (Created, Processed) | (Created, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RefundStatus::*;
        match self {
            Created => vec![Processed, Failed],
            Processed | Failed => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundSnapshot {
    pub id: String,
    pub payment_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub notes: serde_json::Value,
    pub created_at: Option<Timestamp>,
}

/// Persisted refund row, keyed by the provider refund id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub payment_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: RefundStatus,
    pub notes: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Refund {
    pub fn project(
        existing: Option<&Refund>,
        snapshot: RefundSnapshot,
        status: RefundStatus,
        now: Timestamp,
    ) -> Projection<Refund> {
        let Some(current) = existing else {
            return Projection::Write(Refund {
                id: snapshot.id,
                payment_id: snapshot.payment_id,
                amount_minor: snapshot.amount_minor,
                currency: snapshot.currency,
                status,
                notes: snapshot.notes,
                created_at: snapshot.created_at.unwrap_or(now),
                updated_at: now,
            });
        };

        if let Transition::Stale { current, incoming } = current.status.advance(status) {
            return Projection::Stale {
                current: current.as_str(),
                incoming: incoming.as_str(),
            };
        }

        let mut next = current.clone();
        next.status = status;
        next.amount_minor = snapshot.amount_minor;
        if !snapshot.notes.is_null() {
            next.notes = snapshot.notes;
        }

        if next == *current {
            Projection::NoChange
        } else {
            next.updated_at = now;
            Projection::Write(next)
        }
    }
}
