//! EventProjector - Applies a decoded [`PaymentEvent`] to stored state.
//!
//! Every branch reads the current row, merges the provider snapshot through
//! the entity's forward-only projection and writes only when something
//! changed. Replays therefore cost reads, never writes.

use std::sync::Arc;

use super::fulfill_order::{FulfillOrderCommand, FulfillmentHandler, FulfillmentOutcome};
use crate::domain::billing::{
    Order, OrderMetadata, OrderSnapshot, Payment, PaymentSnapshot, PaymentStatus, Projection,
    Refund, RefundSnapshot, RefundStatus, Subscription, SubscriptionSnapshot, SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;
use crate::domain::webhooks::{PaymentEvent, WebhookError};
use crate::ports::{OrderRepository, PaymentRepository, RefundRepository, SubscriptionRepository};

/// What a projection did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionReport {
    pub rows_written: usize,
    /// Rows left untouched because the event was older than stored state.
    pub stale: usize,
    pub fulfillment: Option<FulfillmentOutcome>,
}

pub struct EventProjector {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    refunds: Arc<dyn RefundRepository>,
    fulfillment: Arc<FulfillmentHandler>,
}

impl EventProjector {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        refunds: Arc<dyn RefundRepository>,
        fulfillment: Arc<FulfillmentHandler>,
    ) -> Self {
        Self {
            payments,
            orders,
            subscriptions,
            refunds,
            fulfillment,
        }
    }

    pub async fn project(
        &self,
        event: PaymentEvent,
        now: Timestamp,
    ) -> Result<ProjectionReport, WebhookError> {
        let mut report = ProjectionReport::default();

        match event {
            PaymentEvent::PaymentAuthorized { payment } => {
                self.payment(&mut report, payment, PaymentStatus::Authorized, now)
                    .await?;
            }
            PaymentEvent::PaymentCaptured { payment, metadata } => {
                self.payment_captured(&mut report, payment, metadata, now)
                    .await?;
            }
            PaymentEvent::PaymentFailed { payment } => {
                let order_id = payment.order_id.clone();
                self.payment(&mut report, payment, PaymentStatus::Failed, now)
                    .await?;
                if let Some(order_id) = order_id {
                    self.order_transition(&mut report, &order_id, |order| {
                        order.mark_failed(now)
                    })
                    .await?;
                }
            }
            PaymentEvent::PaymentCancelled { payment } => {
                self.payment(&mut report, payment, PaymentStatus::Cancelled, now)
                    .await?;
            }
            PaymentEvent::OrderPaid { order, payment_id } => {
                self.order_paid(&mut report, order, payment_id, now).await?;
            }
            PaymentEvent::SubscriptionActivated { subscription } => {
                self.subscription(&mut report, subscription, SubscriptionStatus::Active, now)
                    .await?;
            }
            PaymentEvent::SubscriptionCharged {
                subscription,
                payment,
            } => {
                self.subscription(&mut report, subscription, SubscriptionStatus::Active, now)
                    .await?;
                if let Some(payment) = payment {
                    self.payment(&mut report, payment, PaymentStatus::Captured, now)
                        .await?;
                }
            }
            PaymentEvent::SubscriptionUpdated {
                subscription,
                status,
            } => {
                self.subscription(&mut report, subscription, status, now)
                    .await?;
            }
            PaymentEvent::SubscriptionCancelled { subscription } => {
                self.subscription(&mut report, subscription, SubscriptionStatus::Cancelled, now)
                    .await?;
            }
            PaymentEvent::SubscriptionCompleted { subscription } => {
                self.subscription(&mut report, subscription, SubscriptionStatus::Completed, now)
                    .await?;
            }
            PaymentEvent::RefundCreated { refund } => {
                self.refund(&mut report, refund, RefundStatus::Created, now)
                    .await?;
            }
            PaymentEvent::RefundProcessed { refunds } => {
                for refund in refunds {
                    self.refund(&mut report, refund, RefundStatus::Processed, now)
                        .await?;
                }
            }
            PaymentEvent::RefundFailed { refund } => {
                self.refund(&mut report, refund, RefundStatus::Failed, now)
                    .await?;
            }
            PaymentEvent::Unrecognized { .. } => {}
        }

        Ok(report)
    }

    /// Upserts the payment, marks its order paid and runs fulfillment.
    async fn payment_captured(
        &self,
        report: &mut ProjectionReport,
        payment: PaymentSnapshot,
        metadata: OrderMetadata,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let payment_id = payment.id.clone();
        let order_id = payment.order_id.clone();

        let applied = self
            .payment(report, payment, PaymentStatus::Captured, now)
            .await?;
        if !applied {
            return Ok(());
        }

        if let Some(order_id) = &order_id {
            self.order_transition(report, order_id, |order| {
                order.mark_paid(Some(&payment_id), now)
            })
            .await?;
        }

        let outcome = self
            .fulfillment
            .handle(
                FulfillOrderCommand {
                    payment_id,
                    order_id,
                    metadata,
                },
                now,
            )
            .await?;
        report.fulfillment = Some(outcome);
        Ok(())
    }

    /// Returns `false` when the event was stale for this payment.
    async fn payment(
        &self,
        report: &mut ProjectionReport,
        snapshot: PaymentSnapshot,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<bool, WebhookError> {
        let id = snapshot.id.clone();
        let existing = self.payments.find_by_id(&id).await?;
        let projection = Payment::project(existing.as_ref(), snapshot, status, now);
        match settle(report, "payment", &id, projection) {
            Settled::Write(row) => {
                self.payments.upsert(&row).await?;
                Ok(true)
            }
            Settled::NoChange => Ok(true),
            Settled::Stale => Ok(false),
        }
    }

    /// Applies a status move to an order that is already stored.
    ///
    /// Orders are written at checkout; one missing here is logged and left
    /// for `order.paid` to create.
    async fn order_transition<F>(
        &self,
        report: &mut ProjectionReport,
        order_id: &str,
        transition: F,
    ) -> Result<(), WebhookError>
    where
        F: FnOnce(&Order) -> Projection<Order>,
    {
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            tracing::debug!(%order_id, "Order not found, skipping status update");
            return Ok(());
        };
        if let Settled::Write(row) = settle(report, "order", order_id, transition(&order)) {
            self.orders.upsert(&row).await?;
        }
        Ok(())
    }

    async fn order_paid(
        &self,
        report: &mut ProjectionReport,
        snapshot: OrderSnapshot,
        payment_id: Option<String>,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let id = snapshot.id.clone();
        let existing = self.orders.find_by_id(&id).await?;
        let projection = match &existing {
            Some(order) => order.mark_paid(payment_id.as_deref(), now),
            None => match Order::project_paid(None, snapshot, now) {
                Projection::Write(mut order) => {
                    order.payment_id = payment_id;
                    Projection::Write(order)
                }
                other => other,
            },
        };
        if let Settled::Write(row) = settle(report, "order", &id, projection) {
            self.orders.upsert(&row).await?;
        }
        Ok(())
    }

    async fn subscription(
        &self,
        report: &mut ProjectionReport,
        snapshot: SubscriptionSnapshot,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let id = snapshot.id.clone();
        let existing = self.subscriptions.find_by_id(&id).await?;
        let projection = Subscription::project(existing.as_ref(), snapshot, status, now);
        if let Settled::Write(row) = settle(report, "subscription", &id, projection) {
            self.subscriptions.upsert(&row).await?;
        }
        Ok(())
    }

    async fn refund(
        &self,
        report: &mut ProjectionReport,
        snapshot: RefundSnapshot,
        status: RefundStatus,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let id = snapshot.id.clone();
        let existing = self.refunds.find_by_id(&id).await?;
        let projection = Refund::project(existing.as_ref(), snapshot, status, now);
        if let Settled::Write(row) = settle(report, "refund", &id, projection) {
            self.refunds.upsert(&row).await?;
        }
        Ok(())
    }
}

enum Settled<T> {
    Write(T),
    NoChange,
    Stale,
}

/// Books a projection into the report and logs stale events.
fn settle<T>(
    report: &mut ProjectionReport,
    entity: &'static str,
    id: &str,
    projection: Projection<T>,
) -> Settled<T> {
    match projection {
        Projection::Write(row) => {
            report.rows_written += 1;
            Settled::Write(row)
        }
        Projection::NoChange => Settled::NoChange,
        Projection::Stale { current, incoming } => {
            report.stale += 1;
            tracing::info!(entity, %id, current, incoming, "Ignoring out-of-order event");
            Settled::Stale
        }
    }
}
