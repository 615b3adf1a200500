//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{datetime, db_error, timestamp};
use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    provider: String,
    user_id: Option<String>,
    plan_id: Option<String>,
    status: String,
    current_start: Option<DateTime<Utc>>,
    current_end: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    paid_count: i32,
    remaining_count: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: row.id,
            provider: row.provider.parse()?,
            user_id: row.user_id,
            plan_id: row.plan_id,
            status: row.status.parse()?,
            current_start: timestamp(row.current_start),
            current_end: timestamp(row.current_end),
            ended_at: timestamp(row.ended_at),
            paid_count: row.paid_count,
            remaining_count: row.remaining_count,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, provider, user_id, plan_id, status, current_start, current_end,
                   ended_at, paid_count, remaining_count, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        // paid_count uses GREATEST so two racing charges cannot lower it.
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, provider, user_id, plan_id, status, current_start, current_end,
                ended_at, paid_count, remaining_count, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                user_id = COALESCE(subscriptions.user_id, EXCLUDED.user_id),
                plan_id = COALESCE(subscriptions.plan_id, EXCLUDED.plan_id),
                status = EXCLUDED.status,
                current_start = EXCLUDED.current_start,
                current_end = EXCLUDED.current_end,
                ended_at = EXCLUDED.ended_at,
                paid_count = GREATEST(subscriptions.paid_count, EXCLUDED.paid_count),
                remaining_count = EXCLUDED.remaining_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&subscription.id)
        .bind(subscription.provider.as_str())
        .bind(&subscription.user_id)
        .bind(&subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(datetime(subscription.current_start))
        .bind(datetime(subscription.current_end))
        .bind(datetime(subscription.ended_at))
        .bind(subscription.paid_count)
        .bind(subscription.remaining_count)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert subscription"))?;

        Ok(())
    }
}
