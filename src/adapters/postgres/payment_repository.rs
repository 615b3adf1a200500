//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::db_error;
use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::PaymentRepository;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    provider: String,
    order_id: Option<String>,
    subscription_id: Option<String>,
    amount_minor: i64,
    currency: String,
    status: String,
    method: Option<String>,
    fee_minor: i64,
    tax_minor: i64,
    error_code: Option<String>,
    error_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            provider: row.provider.parse()?,
            order_id: row.order_id,
            subscription_id: row.subscription_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status: row.status.parse()?,
            method: row.method,
            fee_minor: row.fee_minor,
            tax_minor: row.tax_minor,
            error_code: row.error_code,
            error_description: row.error_description,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, provider, order_id, subscription_id, amount_minor, currency, status,
                   method, fee_minor, tax_minor, error_code, error_description,
                   created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch payment"))?;

        row.map(Payment::try_from).transpose()
    }

    async fn upsert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, provider, order_id, subscription_id, amount_minor, currency, status,
                method, fee_minor, tax_minor, error_code, error_description,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                order_id = EXCLUDED.order_id,
                subscription_id = EXCLUDED.subscription_id,
                amount_minor = EXCLUDED.amount_minor,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                method = EXCLUDED.method,
                fee_minor = EXCLUDED.fee_minor,
                tax_minor = EXCLUDED.tax_minor,
                error_code = EXCLUDED.error_code,
                error_description = EXCLUDED.error_description,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&payment.id)
        .bind(payment.provider.as_str())
        .bind(&payment.order_id)
        .bind(&payment.subscription_id)
        .bind(payment.amount_minor)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(payment.fee_minor)
        .bind(payment.tax_minor)
        .bind(&payment.error_code)
        .bind(&payment.error_description)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert payment"))?;

        Ok(())
    }
}
