//! OrderRepository port - Row-level access to the `payment_orders` table.
//!
//! Orders are created when a checkout starts and afterwards only mutated by
//! webhook projections. They are never deleted.

use async_trait::async_trait;

use crate::domain::billing::Order;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, DomainError>;

    /// Insert or fully replace the row with this id.
    async fn upsert(&self, order: &Order) -> Result<(), DomainError>;
}
