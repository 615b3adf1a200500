use async_trait::async_trait;

use crate::domain::billing::Refund;
use crate::domain::foundation::DomainError;

/// Port for the `refunds` table, keyed by provider refund id.
#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Refund>, DomainError>;

    async fn upsert(&self, refund: &Refund) -> Result<(), DomainError>;
}
