//! EntitlementRepository port - Grants the access a captured payment bought.

use async_trait::async_trait;

use crate::domain::billing::{GrantResult, UserLicense};
use crate::domain::foundation::{DomainError, Timestamp};

/// Port for writing licence grants and generation unlocks.
///
/// Both operations are idempotent: a licence is unique per
/// `(user_id, license_id)` and unlocking an already paid generation is a
/// plain overwrite with the same values.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Inserts the grant unless the user already holds the licence.
    async fn grant_license(&self, license: &UserLicense) -> Result<GrantResult, DomainError>;

    /// Sets `payment_status = 'paid'` on the generation.
    ///
    /// Returns `false` when no generation with this id exists.
    async fn mark_generation_paid(
        &self,
        generation_id: &str,
        payment_id: &str,
        now: Timestamp,
    ) -> Result<bool, DomainError>;
}
