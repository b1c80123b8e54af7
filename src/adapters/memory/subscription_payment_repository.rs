//! In-memory subscription payment log.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::checkout::SubscriptionPayment;
use crate::domain::foundation::DomainError;
use crate::ports::SubscriptionPaymentRepository;

/// In-memory `SubscriptionPaymentRepository`.
#[derive(Default)]
pub struct InMemorySubscriptionPaymentRepository {
    payments: RwLock<Vec<SubscriptionPayment>>,
    fail_writes: AtomicBool,
}

impl InMemorySubscriptionPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create` fail.
    pub async fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<SubscriptionPayment> {
        self.payments.read().await.clone()
    }
}

#[async_trait]
impl SubscriptionPaymentRepository for InMemorySubscriptionPaymentRepository {
    async fn create(&self, payment: &SubscriptionPayment) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("subscription payment insert failed"));
        }
        self.payments.write().await.push(payment.clone());
        Ok(())
    }

    async fn list_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<SubscriptionPayment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}
