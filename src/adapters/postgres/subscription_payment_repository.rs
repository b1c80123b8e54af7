//! PostgreSQL implementation of SubscriptionPaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::checkout::{SubscriptionPayment, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionPaymentId, Timestamp, UserId,
};
use crate::ports::SubscriptionPaymentRepository;

pub struct PostgresSubscriptionPaymentRepository {
    pool: PgPool,
}

impl PostgresSubscriptionPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionPaymentRow {
    id: Uuid,
    user_id: String,
    subscription_id: String,
    status: String,
    observed_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionPaymentRow> for SubscriptionPayment {
    type Error = DomainError;

    fn try_from(row: SubscriptionPaymentRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionPayment {
            id: SubscriptionPaymentId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            subscription_id: row.subscription_id,
            status: SubscriptionStatus::from_provider(&row.status),
            observed_at: Timestamp::from_datetime(row.observed_at),
        })
    }
}

#[async_trait]
impl SubscriptionPaymentRepository for PostgresSubscriptionPaymentRepository {
    async fn create(&self, payment: &SubscriptionPayment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_payments (id, user_id, subscription_id, status, observed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(&payment.subscription_id)
        .bind(payment.status.as_str())
        .bind(payment.observed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to record subscription payment: {}", e))
        })?;

        Ok(())
    }

    async fn list_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<SubscriptionPayment>, DomainError> {
        let rows: Vec<SubscriptionPaymentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subscription_id, status, observed_at
            FROM subscription_payments
            WHERE subscription_id = $1
            ORDER BY observed_at ASC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to list subscription payments: {}", e))
        })?;

        rows.into_iter().map(SubscriptionPayment::try_from).collect()
    }
}
