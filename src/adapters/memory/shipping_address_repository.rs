//! In-memory shipping address store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::checkout::ShippingAddress;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::ShippingAddressRepository;

/// In-memory `ShippingAddressRepository`.
///
/// Enforces at most one default address per user, like the partial
/// unique index in Postgres.
#[derive(Default)]
pub struct InMemoryShippingAddressRepository {
    addresses: RwLock<Vec<ShippingAddress>>,
}

impl InMemoryShippingAddressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count_for(&self, user_id: &UserId) -> usize {
        self.addresses
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == *user_id)
            .count()
    }
}

#[async_trait]
impl ShippingAddressRepository for InMemoryShippingAddressRepository {
    async fn find_default(&self, user_id: &UserId) -> Result<Option<ShippingAddress>, DomainError> {
        Ok(self
            .addresses
            .read()
            .await
            .iter()
            .find(|a| a.user_id == *user_id && a.is_default)
            .cloned())
    }

    async fn create(&self, address: &ShippingAddress) -> Result<(), DomainError> {
        let mut addresses = self.addresses.write().await;
        if address.is_default
            && addresses
                .iter()
                .any(|a| a.user_id == address.user_id && a.is_default)
        {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "user already has a default shipping address",
            ));
        }
        addresses.push(address.clone());
        Ok(())
    }
}
