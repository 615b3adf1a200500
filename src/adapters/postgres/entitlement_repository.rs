//! PostgreSQL implementation of EntitlementRepository.
//!
//! `generations` is owned by the generation pipeline; only its payment
//! columns are written here.

use async_trait::async_trait;
use sqlx::PgPool;

use super::db_error;
use crate::domain::billing::{GrantResult, UserLicense};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::EntitlementRepository;

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn grant_license(&self, license: &UserLicense) -> Result<GrantResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_licenses (id, user_id, license_id, payment_id, granted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, license_id) DO NOTHING
            "#,
        )
        .bind(license.id)
        .bind(&license.user_id)
        .bind(&license.license_id)
        .bind(&license.payment_id)
        .bind(license.granted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to grant licence"))?;

        if result.rows_affected() > 0 {
            Ok(GrantResult::Granted)
        } else {
            Ok(GrantResult::AlreadyGranted)
        }
    }

    async fn mark_generation_paid(
        &self,
        generation_id: &str,
        payment_id: &str,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE generations
            SET payment_status = 'paid', payment_id = $2, updated_at = $3
            WHERE id::text = $1
            "#,
        )
        .bind(generation_id)
        .bind(payment_id)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to unlock generation"))?;

        Ok(result.rows_affected() > 0)
    }
}
