//! HTTP handlers for the payment webhook.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::application::handlers::checkout::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
use crate::domain::webhook::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse};

/// Header carrying the Stripe signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the checkout routes.
#[derive(Clone)]
pub struct CheckoutAppState {
    pub webhook_handler: Arc<HandlePaymentWebhookHandler>,
}

impl CheckoutAppState {
    pub fn new(webhook_handler: Arc<HandlePaymentWebhookHandler>) -> Self {
        Self { webhook_handler }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Handle Stripe webhook events
pub async fn handle_stripe_webhook(
    State(state): State<CheckoutAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match state.webhook_handler.handle(cmd).await? {
        HandlePaymentWebhookResult::AlreadyProcessed => {
            tracing::debug!("Duplicate delivery acknowledged");
        }
        HandlePaymentWebhookResult::Ignored { event_type } => {
            tracing::debug!(%event_type, "Unhandled event type acknowledged");
        }
        HandlePaymentWebhookResult::CheckoutCompleted { .. }
        | HandlePaymentWebhookResult::SubscriptionUpdated(_) => {}
    }

    Ok((StatusCode::OK, Json(WebhookAckResponse::ok())))
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if self.0.is_verification_failure() {
            tracing::warn!(error = %self.0, "Webhook rejected");
        } else {
            tracing::error!(error = %self.0, "Webhook processing failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::{CheckoutError, SagaStep};

    #[test]
    fn missing_signature_is_server_error() {
        let response = WebhookApiError::from(WebhookError::MissingSignature).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn checkout_failure_is_server_error() {
        let err = WebhookError::Checkout(CheckoutError::CommitPointFailed {
            step: SagaStep::SendOrderConfirmation,
            message: "smtp down".to_string(),
        });
        let response = WebhookApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CheckoutAppState>();
    }
}
