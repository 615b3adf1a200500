//! State machine trait for status enums.
//!
//! Provider webhooks arrive at-least-once and in no guaranteed order, so every
//! lifecycle status (payment, order, subscription, refund) only ever moves
//! forward. Re-applying the current state is a no-op and an event that would
//! move an entity backwards is reported as stale.

use super::ValidationError;

/// Outcome of applying a provider-reported status to a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Status moved forward to the contained state.
    Advanced(S),
    /// Incoming status equals the stored one (replayed delivery).
    Unchanged,
    /// Incoming status is behind the stored one (out-of-order delivery).
    Stale { current: S, incoming: S },
}

impl<S> Transition<S> {
    /// True unless the event arrived out of order.
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Transition::Stale { .. })
    }
}

/// Trait for status enums that represent state machines.
///
/// Implementors define valid forward transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Authorized, Captured) | (Authorized, Failed))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Authorized => vec![Captured, Failed],
///             Captured | Failed => vec![],
///         }
///     }
/// }
///
/// match stored.status.advance(incoming) {
///     Transition::Advanced(next) => stored.status = next,
///     Transition::Unchanged => {}
///     Transition::Stale { .. } => return Ok(Projection::Stale),
/// }
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if a move from self to a *different* target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Classifies an incoming status against the current one.
    fn advance(&self, incoming: Self) -> Transition<Self> {
        if *self == incoming {
            Transition::Unchanged
        } else if self.can_transition_to(&incoming) {
            Transition::Advanced(incoming)
        } else {
            Transition::Stale {
                current: *self,
                incoming,
            }
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
