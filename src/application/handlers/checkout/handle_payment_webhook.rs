//! HandlePaymentWebhookHandler - entry point for payment provider webhooks.
//!
//! Verifies the delivery, consults the webhook ledger, dispatches by event
//! type and records the outcome. A completed checkout that carries a
//! subscription also runs the subscription handler against the freshly
//! fetched subscription.

use std::sync::Arc;

use crate::domain::webhook::WebhookError;
use crate::ports::{
    CheckoutSession, PaymentProvider, SaveResult, WebhookEvent, WebhookEventRecord,
    WebhookEventRepository, WebhookPayload,
};

use super::complete_checkout::{
    CompleteCheckoutCommand, CompleteCheckoutHandler, CompleteCheckoutResult,
};
use super::handle_subscription_event::{
    HandleSubscriptionEventCommand, HandleSubscriptionEventHandler, HandleSubscriptionEventResult,
};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    CheckoutCompleted {
        checkout: CompleteCheckoutResult,
        subscription: Option<HandleSubscriptionEventResult>,
    },
    SubscriptionUpdated(HandleSubscriptionEventResult),
    /// Event already handled to a terminal outcome.
    AlreadyProcessed,
    /// Event type the storefront does not act on.
    Ignored { event_type: String },
}

pub struct HandlePaymentWebhookHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    webhook_events: Arc<dyn WebhookEventRepository>,
    complete_checkout: Arc<CompleteCheckoutHandler>,
    subscription_events: Arc<HandleSubscriptionEventHandler>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        complete_checkout: Arc<CompleteCheckoutHandler>,
        subscription_events: Arc<HandleSubscriptionEventHandler>,
    ) -> Self {
        Self {
            payment_provider,
            webhook_events,
            complete_checkout,
            subscription_events,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Verify signature and decode
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await?;
        let event_type = event.event_type.as_str().to_string();

        // 2. Skip events that already reached a terminal outcome
        let previous = self
            .webhook_events
            .find_by_event_id(&event.id)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?;
        if let Some(record) = previous {
            if record.outcome.is_terminal() {
                tracing::warn!(
                    event_id = %event.id,
                    %event_type,
                    outcome = record.outcome.as_str(),
                    "duplicate webhook delivery, skipping"
                );
                return Ok(HandlePaymentWebhookResult::AlreadyProcessed);
            }
            tracing::info!(event_id = %event.id, "retrying previously failed webhook event");
        }

        // 3. Dispatch
        let outcome = self.dispatch(&event).await;

        // 4. Record the outcome
        let record = match &outcome {
            Ok(HandlePaymentWebhookResult::Ignored { .. }) => WebhookEventRecord::ignored(
                &event.id,
                &event_type,
                "unhandled event type",
                event.raw.clone(),
            ),
            Ok(_) => WebhookEventRecord::success(&event.id, &event_type, event.raw.clone()),
            Err(e) => {
                tracing::error!(event_id = %event.id, %event_type, error = %e, "webhook processing failed");
                WebhookEventRecord::failed(&event.id, &event_type, e.to_string(), event.raw.clone())
            }
        };
        match self.webhook_events.save(record).await {
            Ok(SaveResult::Inserted) => {}
            Ok(SaveResult::AlreadyExists) => {
                tracing::warn!(event_id = %event.id, "webhook event recorded concurrently");
            }
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "failed to record webhook event");
            }
        }

        outcome
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<HandlePaymentWebhookResult, WebhookError> {
        match &event.payload {
            WebhookPayload::CheckoutSession(session) => {
                self.handle_checkout_completed(&event.id, session).await
            }
            WebhookPayload::Subscription(subscription) => {
                let user_id = subscription
                    .user_id
                    .clone()
                    .ok_or(WebhookError::MissingMetadata("user_id"))?;
                let result = self
                    .subscription_events
                    .handle(HandleSubscriptionEventCommand {
                        user_id,
                        subscription: subscription.clone(),
                        customer_email: None,
                    })
                    .await?;
                Ok(HandlePaymentWebhookResult::SubscriptionUpdated(result))
            }
            WebhookPayload::Unrecognized => {
                tracing::debug!(event_id = %event.id, event_type = event.event_type.as_str(), "ignoring webhook event");
                Ok(HandlePaymentWebhookResult::Ignored {
                    event_type: event.event_type.as_str().to_string(),
                })
            }
        }
    }

    async fn handle_checkout_completed(
        &self,
        event_id: &str,
        session: &CheckoutSession,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let checkout = self
            .complete_checkout
            .handle(CompleteCheckoutCommand {
                event_id: event_id.to_string(),
                session: session.clone(),
            })
            .await?;

        let Some(subscription_id) = &session.subscription_id else {
            return Ok(HandlePaymentWebhookResult::CheckoutCompleted {
                checkout,
                subscription: None,
            });
        };

        let subscription = self
            .payment_provider
            .get_subscription(subscription_id)
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?
            .ok_or_else(|| {
                WebhookError::Provider(format!("subscription {} not found", subscription_id))
            })?;
        let user_id = session
            .user_id
            .clone()
            .ok_or(WebhookError::MissingMetadata("user_id"))?;

        let result = self
            .subscription_events
            .handle(HandleSubscriptionEventCommand {
                user_id,
                subscription,
                customer_email: session.customer_email.clone(),
            })
            .await?;

        Ok(HandlePaymentWebhookResult::CheckoutCompleted {
            checkout,
            subscription: Some(result),
        })
    }
}
