//! Cultural Sound Lab Payments - webhook verification, event projection and
//! fulfillment for Stripe and Razorpay.
//!
//! Inbound deliveries are authenticated over their raw bytes, decoded into a
//! provider-neutral [`domain::webhooks::PaymentEvent`], recorded in an
//! idempotency ledger and projected onto payment, order, subscription and
//! refund rows. Successful captures grant licenses or unlock generations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
