//! HandleSubscriptionEventHandler - records subscription lifecycle events.
//!
//! Every observed event is appended to the subscription payment log. When
//! the subscription is anywhere but `active`, the customer is asked to pay
//! with an email listing the subscription's current items.

use std::sync::Arc;

use crate::domain::checkout::{
    CheckoutError, SagaStep, SubscriptionPayment, SubscriptionStatus,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{
    NotificationSender, PaymentProvider, ProviderSubscription, SubscriptionPaymentRepository,
    SubscriptionPaymentRequest,
};

use super::product_details::resolve_product_details;

/// Command to handle a subscription lifecycle event.
#[derive(Debug, Clone)]
pub struct HandleSubscriptionEventCommand {
    pub user_id: String,
    /// Subscription as carried by the event.
    pub subscription: ProviderSubscription,
    /// Known contact address, if the caller has one.
    pub customer_email: Option<String>,
}

/// Result of subscription event handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleSubscriptionEventResult {
    /// Subscription is healthy; the event was only logged.
    Recorded { status: SubscriptionStatus },
    /// Subscription needs attention; a payment request went out.
    PaymentRequested {
        status: SubscriptionStatus,
        products: usize,
    },
}

pub struct HandleSubscriptionEventHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    subscription_payments: Arc<dyn SubscriptionPaymentRepository>,
    notifications: Arc<dyn NotificationSender>,
}

impl HandleSubscriptionEventHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        subscription_payments: Arc<dyn SubscriptionPaymentRepository>,
        notifications: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            payment_provider,
            subscription_payments,
            notifications,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleSubscriptionEventCommand,
    ) -> Result<HandleSubscriptionEventResult, CheckoutError> {
        let user_id =
            UserId::new(cmd.user_id).map_err(|e| CheckoutError::InvalidEvent(e.to_string()))?;
        let subscription_id = cmd.subscription.id;
        let status = cmd.subscription.status;

        // 1. Record the observation
        let payment = SubscriptionPayment::record(
            user_id,
            subscription_id.clone(),
            status.clone(),
            Timestamp::now(),
        );
        self.subscription_payments
            .create(&payment)
            .await
            .map_err(|e| {
                CheckoutError::step_failed(SagaStep::RecordSubscriptionPayment, e.to_string())
            })?;

        if status.is_active() {
            tracing::info!(%subscription_id, %status, "subscription event recorded");
            return Ok(HandleSubscriptionEventResult::Recorded { status });
        }

        // 2. Ask for payment with the subscription's current items
        let current = self
            .payment_provider
            .get_subscription(&subscription_id)
            .await
            .map_err(|e| CheckoutError::step_failed(SagaStep::FetchSubscription, e.to_string()))?
            .ok_or_else(|| {
                CheckoutError::step_failed(
                    SagaStep::FetchSubscription,
                    format!("subscription {} not found", subscription_id),
                )
            })?;

        let customer_email = cmd
            .customer_email
            .or(current.customer_email.clone())
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                CheckoutError::step_failed(
                    SagaStep::SendSubscriptionPaymentRequest,
                    "no customer email on subscription",
                )
            })?;

        let products = resolve_product_details(
            self.payment_provider.as_ref(),
            &current.items,
            Some(&current.id),
        )
        .await;
        let product_count = products.len();

        let request = SubscriptionPaymentRequest {
            customer_email,
            subscription_id: subscription_id.clone(),
            status: status.clone(),
            products,
        };
        self.notifications
            .send_subscription_payment_request(&request)
            .await
            .map_err(|e| {
                CheckoutError::step_failed(SagaStep::SendSubscriptionPaymentRequest, e.to_string())
            })?;

        tracing::info!(
            %subscription_id,
            %status,
            products = product_count,
            "subscription payment requested"
        );

        Ok(HandleSubscriptionEventResult::PaymentRequested {
            status,
            products: product_count,
        })
    }
}
