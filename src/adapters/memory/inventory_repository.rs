//! In-memory inventory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::checkout::StockAdjustment;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::InventoryRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    stock: i64,
    sold: i64,
}

/// In-memory `InventoryRepository`.
///
/// Adjusting an unknown product fails the whole batch without touching
/// any counter, mirroring the transactional Postgres adapter.
#[derive(Default)]
pub struct InMemoryInventoryRepository {
    products: RwLock<HashMap<String, Counters>>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds products with their starting stock.
    pub fn with_stock<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let products = products
            .into_iter()
            .map(|(id, stock)| (id.into(), Counters { stock, sold: 0 }))
            .collect();
        Self {
            products: RwLock::new(products),
        }
    }

    /// Adds a product, or resets its counters.
    pub async fn add_product(&self, product_id: &str, stock: i64) {
        self.products
            .write()
            .await
            .insert(product_id.to_string(), Counters { stock, sold: 0 });
    }

    pub async fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.products.read().await.get(product_id).map(|c| c.stock)
    }

    pub async fn sold_count_of(&self, product_id: &str) -> Option<i64> {
        self.products.read().await.get(product_id).map(|c| c.sold)
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn update_stock_and_sold_count(
        &self,
        adjustments: &[StockAdjustment],
    ) -> Result<(), DomainError> {
        let mut products = self.products.write().await;

        if let Some(missing) = adjustments
            .iter()
            .find(|a| !products.contains_key(a.product_id.as_str()))
        {
            return Err(DomainError::new(
                ErrorCode::ProductNotFound,
                format!("product {} not found", missing.product_id),
            ));
        }

        for adjustment in adjustments {
            if let Some(counters) = products.get_mut(adjustment.product_id.as_str()) {
                let quantity = i64::from(adjustment.quantity);
                counters.stock -= quantity;
                counters.sold += quantity;
            }
        }
        Ok(())
    }
}
