//! PostgreSQL implementation of InventoryRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::checkout::StockAdjustment;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::InventoryRepository;

pub struct PostgresInventoryRepository {
    pool: PgPool,
}

impl PostgresInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    async fn update_stock_and_sold_count(
        &self,
        adjustments: &[StockAdjustment],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::database(format!("Failed to begin stock transaction: {}", e))
        })?;

        for adjustment in adjustments {
            let result = sqlx::query(
                r#"
                UPDATE products SET
                    stock = stock - $2,
                    sold_count = sold_count + $2,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(adjustment.product_id.as_str())
            .bind(i64::from(adjustment.quantity))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to update stock: {}", e)))?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier updates.
                return Err(DomainError::new(
                    ErrorCode::ProductNotFound,
                    format!("product {} not found", adjustment.product_id),
                ));
            }
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit stock update: {}", e)))?;

        tracing::debug!(products = adjustments.len(), "Stock and sold count updated");
        Ok(())
    }
}
