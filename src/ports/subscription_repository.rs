use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::DomainError;

/// Port for the `subscriptions` table, keyed by provider subscription id.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError>;

    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError>;
}
