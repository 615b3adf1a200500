//! In-memory billing store.
//!
//! One struct implements every storage port so tests can assert on the
//! combined state and on the total number of writes ("zero database writes"
//! is a contract for rejected and unrecognized deliveries). Failure switches
//! let tests drive the error paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::billing::{
    GrantResult, Order, Payment, PaymentProvider, Refund, Subscription, UserLicense,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    EntitlementRepository, FulfillmentQueue, FulfillmentTask, FulfillmentTaskStatus,
    OrderRepository, PaymentRepository, RefundRepository, SaveResult, SubscriptionRepository,
    WebhookEventRecord, WebhookEventRepository,
};

/// Generation row as far as billing is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPayment {
    pub payment_status: String,
    pub payment_id: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<String, Payment>,
    orders: HashMap<String, Order>,
    subscriptions: HashMap<String, Subscription>,
    refunds: HashMap<String, Refund>,
    licenses: Vec<UserLicense>,
    generations: HashMap<String, GenerationPayment>,
    webhook_events: HashMap<(PaymentProvider, String), WebhookEventRecord>,
    tasks: HashMap<Uuid, FulfillmentTask>,
}

#[derive(Debug, Default)]
struct Switches {
    fail_writes: AtomicBool,
    fail_entitlements: AtomicBool,
    fail_queue: AtomicBool,
}

/// In-memory implementation of every billing port.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    tables: Arc<RwLock<Tables>>,
    writes: Arc<AtomicUsize>,
    switches: Arc<Switches>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Seeding ===

    /// Inserts an order without counting it as a write.
    pub async fn seed_order(&self, order: Order) {
        self.tables.write().await.orders.insert(order.id.clone(), order);
    }

    /// Inserts an unpaid generation without counting it as a write.
    pub async fn seed_generation(&self, generation_id: &str) {
        self.tables.write().await.generations.insert(
            generation_id.to_string(),
            GenerationPayment {
                payment_status: "pending".to_string(),
                payment_id: None,
            },
        );
    }

    // === Failure injection ===

    /// Makes every write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.switches.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes licence grants and generation unlocks fail.
    pub fn fail_entitlements(&self, fail: bool) {
        self.switches.fail_entitlements.store(fail, Ordering::SeqCst);
    }

    /// Makes enqueueing fulfillment tasks fail.
    pub fn fail_queue(&self, fail: bool) {
        self.switches.fail_queue.store(fail, Ordering::SeqCst);
    }

    // === Inspection ===

    /// Total successful writes across all tables.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn payment(&self, id: &str) -> Option<Payment> {
        self.tables.read().await.payments.get(id).cloned()
    }

    pub async fn order(&self, id: &str) -> Option<Order> {
        self.tables.read().await.orders.get(id).cloned()
    }

    pub async fn subscription(&self, id: &str) -> Option<Subscription> {
        self.tables.read().await.subscriptions.get(id).cloned()
    }

    pub async fn refund(&self, id: &str) -> Option<Refund> {
        self.tables.read().await.refunds.get(id).cloned()
    }

    pub async fn licenses(&self) -> Vec<UserLicense> {
        self.tables.read().await.licenses.clone()
    }

    pub async fn generation(&self, id: &str) -> Option<GenerationPayment> {
        self.tables.read().await.generations.get(id).cloned()
    }

    pub async fn webhook_event_count(&self) -> usize {
        self.tables.read().await.webhook_events.len()
    }

    pub async fn tasks(&self) -> Vec<FulfillmentTask> {
        let mut tasks: Vec<_> = self.tables.read().await.tasks.values().cloned().collect();
        tasks.sort_by_key(|task| task.created_at);
        tasks
    }

    fn check(&self, switch: &AtomicBool, what: &str) -> Result<(), DomainError> {
        if self.switches.fail_writes.load(Ordering::SeqCst) || switch.load(Ordering::SeqCst) {
            Err(DomainError::database(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }

    fn check_write(&self, what: &str) -> Result<(), DomainError> {
        self.check(&self.switches.fail_writes, what)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self.payment(id).await)
    }

    async fn upsert(&self, payment: &Payment) -> Result<(), DomainError> {
        self.check_write("payments")?;
        self.tables
            .write()
            .await
            .payments
            .insert(payment.id.clone(), payment.clone());
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self.order(id).await)
    }

    async fn upsert(&self, order: &Order) -> Result<(), DomainError> {
        self.check_write("payment_orders")?;
        self.tables
            .write()
            .await
            .orders
            .insert(order.id.clone(), order.clone());
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscription(id).await)
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.check_write("subscriptions")?;
        self.tables
            .write()
            .await
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl RefundRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Refund>, DomainError> {
        Ok(self.refund(id).await)
    }

    async fn upsert(&self, refund: &Refund) -> Result<(), DomainError> {
        self.check_write("refunds")?;
        self.tables
            .write()
            .await
            .refunds
            .insert(refund.id.clone(), refund.clone());
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryBillingStore {
    async fn grant_license(&self, license: &UserLicense) -> Result<GrantResult, DomainError> {
        self.check(&self.switches.fail_entitlements, "user_licenses")?;
        let mut tables = self.tables.write().await;
        let exists = tables
            .licenses
            .iter()
            .any(|l| l.user_id == license.user_id && l.license_id == license.license_id);
        if exists {
            return Ok(GrantResult::AlreadyGranted);
        }
        tables.licenses.push(license.clone());
        self.record_write();
        Ok(GrantResult::Granted)
    }

    async fn mark_generation_paid(
        &self,
        generation_id: &str,
        payment_id: &str,
        _now: Timestamp,
    ) -> Result<bool, DomainError> {
        self.check(&self.switches.fail_entitlements, "generations")?;
        let mut tables = self.tables.write().await;
        let Some(generation) = tables.generations.get_mut(generation_id) else {
            return Ok(false);
        };
        generation.payment_status = "paid".to_string();
        generation.payment_id = Some(payment_id.to_string());
        self.record_write();
        Ok(true)
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryBillingStore {
    async fn find(
        &self,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .webhook_events
            .get(&(provider, event_id.to_string()))
            .cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        self.check_write("webhook_events")?;
        let mut tables = self.tables.write().await;
        let key = (record.provider, record.event_id.clone());
        if tables.webhook_events.contains_key(&key) {
            return Ok(SaveResult::AlreadyExists);
        }
        tables.webhook_events.insert(key, record);
        self.record_write();
        Ok(SaveResult::Inserted)
    }

    async fn delete_before(&self, timestamp: Timestamp) -> Result<u64, DomainError> {
        let mut tables = self.tables.write().await;
        let before = tables.webhook_events.len();
        tables
            .webhook_events
            .retain(|_, record| !timestamp.is_after(&record.processed_at));
        Ok((before - tables.webhook_events.len()) as u64)
    }
}

#[async_trait]
impl FulfillmentQueue for InMemoryBillingStore {
    async fn enqueue(&self, task: &FulfillmentTask) -> Result<(), DomainError> {
        self.check(&self.switches.fail_queue, "fulfillment_tasks")?;
        self.tables.write().await.tasks.insert(task.id, task.clone());
        self.record_write();
        Ok(())
    }

    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<FulfillmentTask>, DomainError> {
        let mut due: Vec<_> = self
            .tables
            .read()
            .await
            .tasks
            .values()
            .filter(|task| {
                task.status == FulfillmentTaskStatus::Pending && !task.next_attempt_at.is_after(&now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|task| task.next_attempt_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn update(&self, task: &FulfillmentTask) -> Result<(), DomainError> {
        self.check(&self.switches.fail_queue, "fulfillment_tasks")?;
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.tasks.get_mut(&task.id) else {
            return Err(DomainError::new(
                ErrorCode::FulfillmentTaskNotFound,
                format!("Fulfillment task {} not found", task.id),
            ));
        };
        *existing = task.clone();
        self.record_write();
        Ok(())
    }
}
