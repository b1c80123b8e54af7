//! ShippingAddressRepository port.

use async_trait::async_trait;

use crate::domain::checkout::ShippingAddress;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait ShippingAddressRepository: Send + Sync {
    /// Returns the user's default address, if one has been stored.
    async fn find_default(&self, user_id: &UserId) -> Result<Option<ShippingAddress>, DomainError>;

    /// Stores an address. Fails if it is marked default and the user already
    /// has a default address.
    async fn create(&self, address: &ShippingAddress) -> Result<(), DomainError>;
}
