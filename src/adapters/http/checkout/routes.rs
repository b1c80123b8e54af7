//! Axum router configuration for the checkout endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_stripe_webhook, health, CheckoutAppState};

/// Create the Stripe webhook router.
///
/// Webhooks carry no user authentication; each delivery is verified by
/// signature inside the handler.
///
/// # Routes
/// - `POST /stripe` - Handle Stripe webhooks
pub fn webhook_routes() -> Router<CheckoutAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete checkout module router.
///
/// # Example
///
/// ```ignore
/// let app = checkout_router().with_state(CheckoutAppState::new(handler));
/// ```
pub fn checkout_router() -> Router<CheckoutAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::adapters::memory::{
        InMemoryInventoryRepository, InMemoryOrderRepository, InMemoryShippingAddressRepository,
        InMemorySubscriptionPaymentRepository, InMemoryWebhookEventRepository,
        RecordingNotificationSender,
    };
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::application::handlers::checkout::{
        CompleteCheckoutHandler, HandlePaymentWebhookHandler, HandleSubscriptionEventHandler,
    };
    use crate::domain::webhook::WebhookError;

    fn app(provider: MockPaymentProvider) -> Router {
        let provider = Arc::new(provider);
        let notifications = Arc::new(RecordingNotificationSender::new());
        let checkout = Arc::new(CompleteCheckoutHandler::new(
            provider.clone(),
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryInventoryRepository::new()),
            Arc::new(InMemoryShippingAddressRepository::new()),
            notifications.clone(),
        ));
        let subscriptions = Arc::new(HandleSubscriptionEventHandler::new(
            provider.clone(),
            Arc::new(InMemorySubscriptionPaymentRepository::new()),
            notifications,
        ));
        let handler = Arc::new(HandlePaymentWebhookHandler::new(
            provider,
            Arc::new(InMemoryWebhookEventRepository::new()),
            checkout,
            subscriptions,
        ));
        checkout_router().with_state(CheckoutAppState::new(handler))
    }

    fn webhook_request(signature: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/webhooks/stripe");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app(MockPaymentProvider::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let response = app(MockPaymentProvider::new())
            .oneshot(webhook_request(None, "{}".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "Missing signature header");
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected() {
        let provider = MockPaymentProvider::new().reject_webhooks(WebhookError::InvalidSignature);

        let response = app(provider)
            .oneshot(webhook_request(Some("t=1,v1=00"), "{}".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_acknowledged() {
        let body = json!({
            "id": "evt_1",
            "type": "invoice.paid",
            "created": 1704067200,
            "data": { "object": { "id": "in_1" } }
        })
        .to_string();

        let response = app(MockPaymentProvider::new())
            .oneshot(webhook_request(Some("t=1,v1=00"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    #[tokio::test]
    async fn failed_checkout_returns_server_error() {
        // No line items registered for cs_1, so line item resolution fails.
        let body = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": { "object": {
                "id": "cs_1",
                "mode": "payment",
                "amount_total": 1000,
                "currency": "jpy",
                "payment_status": "paid",
                "payment_method_types": ["card"],
                "customer_details": { "email": "buyer@example.com" },
                "metadata": { "user_id": "user_1" }
            }}
        })
        .to_string();

        let response = app(MockPaymentProvider::new())
            .oneshot(webhook_request(Some("t=1,v1=00"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["message"].is_string());
    }
}
