//! PostgreSQL implementation of FulfillmentQueue (`fulfillment_tasks`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;
use crate::domain::billing::FulfillmentTarget;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{FulfillmentQueue, FulfillmentTask, FulfillmentTaskStatus};

pub struct PostgresFulfillmentQueue {
    pool: PgPool,
}

impl PostgresFulfillmentQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FulfillmentTaskRow {
    id: Uuid,
    payment_id: String,
    order_id: Option<String>,
    target: Option<Json<FulfillmentTarget>>,
    user_id: Option<String>,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    next_attempt_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FulfillmentTaskRow> for FulfillmentTask {
    type Error = DomainError;

    fn try_from(row: FulfillmentTaskRow) -> Result<Self, Self::Error> {
        Ok(FulfillmentTask {
            id: row.id,
            payment_id: row.payment_id,
            order_id: row.order_id,
            target: row.target.map(|Json(target)| target),
            user_id: row.user_id,
            status: row.status.parse::<FulfillmentTaskStatus>()?,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            last_error: row.last_error,
            next_attempt_at: Timestamp::from_datetime(row.next_attempt_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn attempts(task: &FulfillmentTask) -> i32 {
    i32::try_from(task.attempts).unwrap_or(i32::MAX)
}

#[async_trait]
impl FulfillmentQueue for PostgresFulfillmentQueue {
    async fn enqueue(&self, task: &FulfillmentTask) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO fulfillment_tasks (
                id, payment_id, order_id, target, user_id, status, attempts,
                last_error, next_attempt_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id)
        .bind(&task.payment_id)
        .bind(&task.order_id)
        .bind(task.target.as_ref().map(Json))
        .bind(&task.user_id)
        .bind(task.status.as_str())
        .bind(attempts(task))
        .bind(&task.last_error)
        .bind(task.next_attempt_at.as_datetime())
        .bind(task.created_at.as_datetime())
        .bind(task.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to enqueue fulfillment task"))?;

        Ok(())
    }

    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<FulfillmentTask>, DomainError> {
        let rows: Vec<FulfillmentTaskRow> = sqlx::query_as(
            r#"
            SELECT id, payment_id, order_id, target, user_id, status, attempts,
                   last_error, next_attempt_at, created_at, updated_at
            FROM fulfillment_tasks
            WHERE status = 'pending' AND next_attempt_at <= $1
            ORDER BY next_attempt_at
            LIMIT $2
            "#,
        )
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch due fulfillment tasks"))?;

        rows.into_iter().map(FulfillmentTask::try_from).collect()
    }

    async fn update(&self, task: &FulfillmentTask) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE fulfillment_tasks SET
                status = $2,
                attempts = $3,
                last_error = $4,
                next_attempt_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(attempts(task))
        .bind(&task.last_error)
        .bind(task.next_attempt_at.as_datetime())
        .bind(task.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update fulfillment task"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::FulfillmentTaskNotFound,
                format!("Fulfillment task {} not found", task.id),
            ));
        }
        Ok(())
    }
}
