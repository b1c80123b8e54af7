//! InventoryRepository port - stock bookkeeping after a sale.

use async_trait::async_trait;

use crate::domain::checkout::StockAdjustment;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Decrements stock and increments sold count for every adjustment.
    ///
    /// Implementations apply the whole slice atomically.
    async fn update_stock_and_sold_count(
        &self,
        adjustments: &[StockAdjustment],
    ) -> Result<(), DomainError>;
}
