//! Foundation module - Shared domain primitives.
//!
//! Contains the timestamp value object, the forward-only state machine
//! trait and error types that form the vocabulary of the payments domain.

mod errors;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use state_machine::{StateMachine, Transition};
pub use timestamp::Timestamp;
