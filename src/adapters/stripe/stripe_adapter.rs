//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API:
//! checkout line items, products, subscriptions, customer shipping and
//! payment links, plus webhook verification.
//!
//! # Security
//!
//! - Webhook signatures are checked by [`StripeWebhookVerifier`]
//!   (HMAC-SHA256, constant-time comparison, 5-minute replay window)
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::checkout::ShippingDetails;
use crate::domain::webhook::{StripeWebhookVerifier, WebhookError};
use crate::ports::{
    PaymentError, PaymentErrorCode, PaymentProvider, ProviderLineItem, ProviderProduct,
    ProviderSubscription, WebhookEvent,
};

use super::webhook_types::{
    decode_event, StripeErrorResponse, StripeLineItem, StripeList, StripeProduct,
    StripeSubscription,
};

/// Page size for line item listing; Stripe's maximum.
const LINE_ITEM_PAGE_SIZE: u32 = 100;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    verifier: StripeWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        let verifier = StripeWebhookVerifier::new(config.webhook_secret.clone());
        Self {
            config,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Sends a request and decodes the body. `Ok(None)` on 404.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<Option<T>, PaymentError> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(operation, status = status.as_u16(), error = %body, "Stripe request failed");
            return Err(api_error(status.as_u16(), &body));
        }

        response.json().await.map(Some).map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }

    /// Like [`send`](Self::send) but a 404 is an error.
    async fn send_required<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
        resource: &str,
    ) -> Result<T, PaymentError> {
        self.send(request, operation)
            .await?
            .ok_or_else(|| PaymentError::not_found(resource))
    }
}

/// Builds a `PaymentError` from a non-success Stripe response.
fn api_error(status: u16, body: &str) -> PaymentError {
    let code = PaymentErrorCode::from_status(status);
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe API error ({})", status));
            let err = PaymentError::new(code, message);
            match parsed.error.code.or(parsed.error.error_type) {
                Some(provider_code) => err.with_provider_code(provider_code),
                None => err,
            }
        }
        Err(_) => PaymentError::new(code, format!("Stripe API error: {}", body)),
    }
}

/// Form parameters for writing shipping details onto a customer.
fn shipping_params(shipping: &ShippingDetails) -> Vec<(&'static str, String)> {
    let mut params = vec![("shipping[name]", shipping.name.clone())];
    if let Some(phone) = &shipping.phone {
        params.push(("shipping[phone]", phone.clone()));
    }
    let address = &shipping.address;
    let fields = [
        ("shipping[address][line1]", &address.line1),
        ("shipping[address][line2]", &address.line2),
        ("shipping[address][city]", &address.city),
        ("shipping[address][state]", &address.state),
        ("shipping[address][postal_code]", &address.postal_code),
        ("shipping[address][country]", &address.country),
    ];
    params.extend(
        fields
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v.clone()))),
    );
    params
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        if signature.trim().is_empty() {
            return Err(WebhookError::MissingSignature);
        }

        let event = self.verifier.verify_and_parse(payload, signature).map_err(|e| {
            tracing::warn!(error = %e, "Webhook verification failed");
            e
        })?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Test mode event rejected in livemode deployment");
            return Err(WebhookError::TestModeRejected);
        }

        let webhook_event = decode_event(event)?;

        tracing::info!(
            event_id = %webhook_event.id,
            event_type = webhook_event.event_type.as_str(),
            "Webhook signature verified"
        );

        Ok(webhook_event)
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<ProviderLineItem>, PaymentError> {
        let url = self.url(&format!("/v1/checkout/sessions/{}/line_items", session_id));
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("limit", LINE_ITEM_PAGE_SIZE.to_string()),
                ("expand[]", "data.price".to_string()),
            ];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }

            let page: StripeList<StripeLineItem> = self
                .send_required(
                    self.http_client.get(&url).query(&query),
                    "list_checkout_line_items",
                    "Checkout session",
                )
                .await?;

            starting_after = page.data.last().map(|item| item.id.clone());
            let has_more = page.has_more;
            items.extend(page.data.into_iter().map(StripeLineItem::into_line_item));

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        tracing::debug!(session_id, count = items.len(), "Fetched checkout line items");
        Ok(items)
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<ProviderProduct>, PaymentError> {
        let url = self.url(&format!("/v1/products/{}", product_id));

        let product: Option<StripeProduct> =
            self.send(self.http_client.get(&url), "get_product").await?;

        Ok(product.filter(|p| !p.deleted).map(ProviderProduct::from))
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        let url = self.url(&format!("/v1/subscriptions/{}", subscription_id));

        let subscription: Option<StripeSubscription> = self
            .send(
                self.http_client.get(&url).query(&[("expand[]", "customer")]),
                "get_subscription",
            )
            .await?;

        Ok(subscription.map(StripeSubscription::into_subscription))
    }

    async fn update_customer_shipping(
        &self,
        customer_id: &str,
        shipping: &ShippingDetails,
    ) -> Result<(), PaymentError> {
        let url = self.url(&format!("/v1/customers/{}", customer_id));

        let _: serde_json::Value = self
            .send_required(
                self.http_client.post(&url).form(&shipping_params(shipping)),
                "update_customer_shipping",
                "Customer",
            )
            .await?;

        tracing::debug!(customer_id, "Updated customer shipping details");
        Ok(())
    }

    async fn deactivate_payment_link(&self, payment_link_id: &str) -> Result<(), PaymentError> {
        let url = self.url(&format!("/v1/payment_links/{}", payment_link_id));

        let _: serde_json::Value = self
            .send_required(
                self.http_client.post(&url).form(&[("active", "false")]),
                "deactivate_payment_link",
                "Payment link",
            )
            .await?;

        tracing::info!(payment_link_id, "Payment link deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::PostalAddress;
    use crate::domain::webhook::sign_payload;
    use crate::ports::WebhookEventType;

    const SECRET: &str = "whsec_test_secret";

    fn test_config() -> StripeConfig {
        StripeConfig::new("sk_test_key", SECRET)
    }

    fn event_payload(livemode: bool) -> String {
        format!(
            r#"{{
                "id": "evt_test123",
                "type": "checkout.session.completed",
                "created": 1704067200,
                "data": {{
                    "object": {{
                        "id": "cs_test",
                        "object": "checkout.session",
                        "customer": "cus_test",
                        "payment_status": "paid",
                        "mode": "payment",
                        "metadata": {{ "user_id": "user_1" }}
                    }}
                }},
                "livemode": {}
            }}"#,
            livemode
        )
    }

    fn signed(payload: &str) -> String {
        sign_payload(SECRET, chrono::Utc::now().timestamp(), payload.as_bytes()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = StripeConfig::new("api_key", "webhook_secret");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert!(!config.require_livemode);
    }

    #[test]
    fn config_with_base_url() {
        let config = StripeConfig::new("key", "secret").with_base_url("http://localhost:8080");
        assert_eq!(config.api_base_url, "http://localhost:8080");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Helpers
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn api_error_uses_stripe_error_body() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such price","type":"invalid_request_error"}}"#;

        let err = api_error(400, body);

        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(err.message, "No such price");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }

    #[test]
    fn api_error_tolerates_non_json_body() {
        let err = api_error(502, "Bad Gateway");

        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.message.contains("Bad Gateway"));
    }

    #[test]
    fn rate_limit_is_retryable() {
        assert!(api_error(429, "{}").retryable);
    }

    #[test]
    fn shipping_params_skip_missing_fields() {
        let shipping = ShippingDetails {
            name: "Hanako Yamada".to_string(),
            phone: None,
            address: PostalAddress {
                line1: Some("1-1 Chiyoda".to_string()),
                postal_code: Some("100-0001".to_string()),
                country: Some("JP".to_string()),
                ..Default::default()
            },
        };

        let params = shipping_params(&shipping);

        assert_eq!(params.len(), 4);
        assert!(params.contains(&("shipping[name]", "Hanako Yamada".to_string())));
        assert!(params.contains(&("shipping[address][country]", "JP".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "shipping[phone]"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Integration Tests (verify_webhook full flow)
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_webhook_valid_signature_and_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(false);

        let event = adapter
            .verify_webhook(payload.as_bytes(), &signed(&payload))
            .await
            .unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.event_type, WebhookEventType::CheckoutSessionCompleted);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_signature() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(false);
        let forged = sign_payload("whsec_other", chrono::Utc::now().timestamp(), payload.as_bytes())
            .unwrap();

        let result = adapter.verify_webhook(payload.as_bytes(), &forged).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn verify_webhook_rejects_empty_header() {
        let adapter = StripePaymentAdapter::new(test_config());

        let result = adapter.verify_webhook(b"{}", "  ").await;

        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_json() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = "not valid json";

        let result = adapter.verify_webhook(payload.as_bytes(), &signed(payload)).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[tokio::test]
    async fn livemode_deployment_rejects_test_events() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload(false);

        let result = adapter.verify_webhook(payload.as_bytes(), &signed(&payload)).await;

        assert!(matches!(result, Err(WebhookError::TestModeRejected)));
    }

    #[tokio::test]
    async fn livemode_deployment_accepts_live_events() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload(true);

        let event = adapter
            .verify_webhook(payload.as_bytes(), &signed(&payload))
            .await
            .unwrap();

        assert!(event.livemode);
    }
}
