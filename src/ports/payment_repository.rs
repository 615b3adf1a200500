//! PaymentRepository port - Row-level access to the `payments` table.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::DomainError;

/// Port for reading and upserting payments keyed by provider payment id.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DomainError>;

    /// Insert or fully replace the row with this id.
    async fn upsert(&self, payment: &Payment) -> Result<(), DomainError>;
}
