//! PostgreSQL implementation of RefundRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::db_error;
use crate::domain::billing::Refund;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::RefundRepository;

pub struct PostgresRefundRepository {
    pool: PgPool,
}

impl PostgresRefundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: String,
    payment_id: String,
    amount_minor: i64,
    currency: String,
    status: String,
    notes: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = DomainError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        Ok(Refund {
            id: row.id,
            payment_id: row.payment_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl RefundRepository for PostgresRefundRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Refund>, DomainError> {
        let row: Option<RefundRow> = sqlx::query_as(
            r#"
            SELECT id, payment_id, amount_minor, currency, status, notes, created_at, updated_at
            FROM refunds
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch refund"))?;

        row.map(Refund::try_from).transpose()
    }

    async fn upsert(&self, refund: &Refund) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, payment_id, amount_minor, currency, status, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                amount_minor = EXCLUDED.amount_minor,
                status = EXCLUDED.status,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.payment_id)
        .bind(refund.amount_minor)
        .bind(&refund.currency)
        .bind(refund.status.as_str())
        .bind(&refund.notes)
        .bind(refund.created_at.as_datetime())
        .bind(refund.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert refund"))?;

        Ok(())
    }
}
