//! Billing module - Payments, orders, subscriptions, refunds and entitlements.
//!
//! Every entity is keyed by the provider-issued id and mutated only through
//! `project`-style merges that return a [`Projection`], so replayed and
//! out-of-order webhooks never regress stored state.

mod entitlement;
mod order;
mod payment;
mod projection;
mod provider;
mod refund;
mod subscription;

pub use entitlement::{FulfillmentTarget, GrantResult, UserLicense};
pub use order::{Order, OrderMetadata, OrderSnapshot, OrderStatus};
pub use payment::{Payment, PaymentSnapshot, PaymentStatus};
pub use projection::Projection;
pub use provider::PaymentProvider;
pub use refund::{Refund, RefundSnapshot, RefundStatus};
pub use subscription::{Subscription, SubscriptionSnapshot, SubscriptionStatus};
