//! NotificationSender port - transactional customer emails.
//!
//! Senders receive structured data; rendering and transport are the
//! adapter's business.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::checkout::{
    OrderStatus, PaymentMethod, ProductDetail, ShippingDetails, SubscriptionStatus,
};
use crate::domain::foundation::DomainError;

/// Data for the order-confirmation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub shipping_fee: i64,
    pub currency: String,
    pub products: Vec<ProductDetail>,
    pub shipping: Option<ShippingDetails>,
}

/// Data for the follow-up email sent when payment is still outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub amount: i64,
    pub currency: String,
}

/// Data for the email sent when a subscription leaves the active state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionPaymentRequest {
    pub customer_email: String,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub products: Vec<ProductDetail>,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), DomainError>;

    async fn send_payment_request(&self, message: &PaymentRequest) -> Result<(), DomainError>;

    async fn send_subscription_payment_request(
        &self,
        message: &SubscriptionPaymentRequest,
    ) -> Result<(), DomainError>;
}
