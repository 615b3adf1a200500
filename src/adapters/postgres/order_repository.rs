//! PostgreSQL implementation of OrderRepository (`payment_orders`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::db_error;
use crate::domain::billing::{Order, OrderMetadata};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::OrderRepository;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: Option<String>,
    amount_minor: i64,
    currency: String,
    status: String,
    metadata: serde_json::Value,
    receipt: Option<String>,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status: row.status.parse()?,
            metadata: OrderMetadata::from_value(&row.metadata),
            receipt: row.receipt,
            payment_id: row.payment_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount_minor, currency, status, metadata, receipt,
                   payment_id, created_at, updated_at
            FROM payment_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn upsert(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                id, user_id, amount_minor, currency, status, metadata, receipt,
                payment_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                user_id = COALESCE(payment_orders.user_id, EXCLUDED.user_id),
                status = EXCLUDED.status,
                metadata = EXCLUDED.metadata,
                receipt = COALESCE(EXCLUDED.receipt, payment_orders.receipt),
                payment_id = COALESCE(EXCLUDED.payment_id, payment_orders.payment_id),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.amount_minor)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(Json(&order.metadata))
        .bind(&order.receipt)
        .bind(&order.payment_id)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert order"))?;

        Ok(())
    }
}
