//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (timestamps, state machines, errors)
//! - `billing` - Payments, orders, subscriptions, refunds and entitlements
//! - `webhooks` - Provider signature verification and event decoding

pub mod billing;
pub mod foundation;
pub mod webhooks;
