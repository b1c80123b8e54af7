//! SubscriptionPaymentRepository port - append-only lifecycle log.

use async_trait::async_trait;

use crate::domain::checkout::SubscriptionPayment;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait SubscriptionPaymentRepository: Send + Sync {
    async fn create(&self, payment: &SubscriptionPayment) -> Result<(), DomainError>;

    /// Lists records for a subscription, oldest first.
    async fn list_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<SubscriptionPayment>, DomainError>;
}
