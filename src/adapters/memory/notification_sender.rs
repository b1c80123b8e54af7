//! Notification sender that records messages instead of sending them.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{
    NotificationSender, OrderConfirmation, PaymentRequest, SubscriptionPaymentRequest,
};

/// Kinds of outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    OrderConfirmation,
    PaymentRequest,
    SubscriptionPaymentRequest,
}

#[derive(Default)]
struct Outbox {
    confirmations: Vec<OrderConfirmation>,
    payment_requests: Vec<PaymentRequest>,
    subscription_requests: Vec<SubscriptionPaymentRequest>,
    failing: HashSet<NotificationKind>,
}

/// Records every message in memory. Messages of a failing kind are not
/// recorded.
#[derive(Default)]
pub struct RecordingNotificationSender {
    outbox: RwLock<Outbox>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent message of `kind` fail.
    pub async fn fail_on(&self, kind: NotificationKind) {
        self.outbox.write().await.failing.insert(kind);
    }

    /// Lets messages of `kind` go through again.
    pub async fn recover(&self, kind: NotificationKind) {
        self.outbox.write().await.failing.remove(&kind);
    }

    pub async fn confirmations(&self) -> Vec<OrderConfirmation> {
        self.outbox.read().await.confirmations.clone()
    }

    pub async fn payment_requests(&self) -> Vec<PaymentRequest> {
        self.outbox.read().await.payment_requests.clone()
    }

    pub async fn subscription_requests(&self) -> Vec<SubscriptionPaymentRequest> {
        self.outbox.read().await.subscription_requests.clone()
    }
}

fn check(outbox: &Outbox, kind: NotificationKind) -> Result<(), DomainError> {
    if outbox.failing.contains(&kind) {
        return Err(DomainError::new(
            ErrorCode::NotificationError,
            format!("{:?} delivery failed", kind),
        ));
    }
    Ok(())
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), DomainError> {
        let mut outbox = self.outbox.write().await;
        check(&outbox, NotificationKind::OrderConfirmation)?;
        outbox.confirmations.push(message.clone());
        Ok(())
    }

    async fn send_payment_request(&self, message: &PaymentRequest) -> Result<(), DomainError> {
        let mut outbox = self.outbox.write().await;
        check(&outbox, NotificationKind::PaymentRequest)?;
        outbox.payment_requests.push(message.clone());
        Ok(())
    }

    async fn send_subscription_payment_request(
        &self,
        message: &SubscriptionPaymentRequest,
    ) -> Result<(), DomainError> {
        let mut outbox = self.outbox.write().await;
        check(&outbox, NotificationKind::SubscriptionPaymentRequest)?;
        outbox.subscription_requests.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::PaymentMethod;

    fn request() -> PaymentRequest {
        PaymentRequest {
            order_number: "20240101-ABCDEF12".to_string(),
            customer_email: "buyer@example.com".to_string(),
            customer_name: None,
            payment_method: PaymentMethod::Konbini,
            amount: 1500,
            currency: "jpy".to_string(),
        }
    }

    #[tokio::test]
    async fn failing_kind_is_not_recorded() {
        let sender = RecordingNotificationSender::new();
        sender.fail_on(NotificationKind::PaymentRequest).await;

        let err = sender.send_payment_request(&request()).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::NotificationError);
        assert!(sender.payment_requests().await.is_empty());
    }

    #[tokio::test]
    async fn other_kinds_keep_working() {
        let sender = RecordingNotificationSender::new();
        sender.fail_on(NotificationKind::OrderConfirmation).await;

        sender.send_payment_request(&request()).await.unwrap();

        assert_eq!(sender.payment_requests().await.len(), 1);
    }
}
