//! PostgreSQL implementation of OrderRepository.
//!
//! Batch inserts run inside one transaction so a failed batch leaves no
//! partial rows behind; the saga only has to compensate whole steps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::checkout::{
    ItemPaymentLinkage, LineItem, Order, OrderStatus, PaymentLinkage, PaymentMethod, SagaStep,
    SubscriptionLinkage,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, LineItemId, OrderId, Timestamp, UserId,
};
use crate::ports::OrderRepository;

const PAYMENT_LINKAGE_SESSION_KEY: &str = "payment_linkages_checkout_session_id_key";

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: String,
    status: String,
    total_amount: i64,
    shipping_fee: i64,
    currency: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid order status: {}", row.status),
            )
        })?;
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            order_number: row.order_number,
            user_id,
            status,
            total_amount: row.total_amount,
            shipping_fee: row.shipping_fee,
            currency: row.currency,
            payment_method: PaymentMethod::parse(&row.payment_method),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_order_by_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT o.id, o.order_number, o.user_id, o.status, o.total_amount,
                   o.shipping_fee, o.currency, o.payment_method, o.created_at
            FROM orders o
            JOIN payment_linkages p ON p.order_id = o.id
            WHERE p.checkout_session_id = $1
            "#,
        )
        .bind(checkout_session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find order by session", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn create_order(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, status, total_amount, shipping_fee,
                currency, payment_method, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.user_id.as_str())
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.shipping_fee)
        .bind(&order.currency)
        .bind(order.payment_method.as_str())
        .bind(order.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create order", e))?;

        Ok(())
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete order", e))?;
        Ok(())
    }

    async fn create_payment_linkage(&self, linkage: &PaymentLinkage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_linkages (order_id, checkout_session_id, payment_intent_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(linkage.order_id.as_uuid())
        .bind(&linkage.checkout_session_id)
        .bind(&linkage.payment_intent_id)
        .bind(linkage.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(PAYMENT_LINKAGE_SESSION_KEY) {
                    return DomainError::new(
                        ErrorCode::Conflict,
                        "Checkout session already linked to an order",
                    )
                    .with_detail("checkout_session_id", &linkage.checkout_session_id);
                }
            }
            db_error("create payment linkage", e)
        })?;

        Ok(())
    }

    async fn delete_payment_linkage(&self, order_id: &OrderId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM payment_linkages WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete payment linkage", e))?;
        Ok(())
    }

    async fn create_line_items(&self, items: &[LineItem]) -> Result<Vec<LineItemId>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let mut ids = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO line_items (
                    id, order_id, product_id, unit_price, quantity, amount, remarks, position
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(item.unit_price)
            .bind(i64::from(item.quantity))
            .bind(item.amount)
            .bind(&item.remarks)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("create line item", e))?;
            ids.push(LineItemId::from_uuid(id));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit line items", e))?;

        Ok(ids)
    }

    async fn delete_line_items(&self, order_id: &OrderId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM line_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete line items", e))?;
        Ok(())
    }

    async fn create_subscription_linkages(
        &self,
        linkages: &[SubscriptionLinkage],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        for linkage in linkages {
            sqlx::query(
                r#"
                INSERT INTO subscription_linkages (
                    line_item_id, subscription_id, status, interval, interval_count
                ) VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(linkage.line_item_id.as_uuid())
            .bind(&linkage.subscription_id)
            .bind(linkage.status.as_str())
            .bind(linkage.interval.as_str())
            .bind(linkage.interval_count as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("create subscription linkage", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit subscription linkages", e))
    }

    async fn delete_subscription_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError> {
        let ids: Vec<Uuid> = line_item_ids.iter().map(|id| *id.as_uuid()).collect();
        sqlx::query("DELETE FROM subscription_linkages WHERE line_item_id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete subscription linkages", e))?;
        Ok(())
    }

    async fn create_item_payment_linkages(
        &self,
        linkages: &[ItemPaymentLinkage],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        for linkage in linkages {
            sqlx::query("INSERT INTO item_payment_linkages (line_item_id, price_id) VALUES ($1, $2)")
                .bind(linkage.line_item_id.as_uuid())
                .bind(&linkage.price_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("create item payment linkage", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit item payment linkages", e))
    }

    async fn delete_item_payment_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError> {
        let ids: Vec<Uuid> = line_item_ids.iter().map(|id| *id.as_uuid()).collect();
        sqlx::query("DELETE FROM item_payment_linkages WHERE line_item_id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete item payment linkages", e))?;
        Ok(())
    }

    async fn completed_fulfillment_steps(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<SagaStep>, DomainError> {
        let steps: Vec<String> = sqlx::query_scalar(
            "SELECT step FROM order_fulfillment_steps WHERE order_id = $1 ORDER BY completed_at",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load fulfillment steps", e))?;

        steps
            .iter()
            .map(|s| {
                SagaStep::parse(s).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid fulfillment step: {}", s),
                    )
                })
            })
            .collect()
    }

    async fn record_fulfillment_step(
        &self,
        order_id: &OrderId,
        step: SagaStep,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO order_fulfillment_steps (order_id, step, completed_at)
            VALUES ($1, $2, now())
            ON CONFLICT (order_id, step) DO NOTHING
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(step.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record fulfillment step", e))?;
        Ok(())
    }
}
