//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured sessions, products and subscriptions
//! - Error injection per method or per product
//! - Call tracking
//! - Unsigned webhook events, decoded exactly like the Stripe adapter does

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::checkout::ShippingDetails;
use crate::domain::webhook::{StripeEvent, WebhookError};
use crate::ports::{
    PaymentError, PaymentProvider, ProviderLineItem, ProviderProduct, ProviderSubscription,
    WebhookEvent,
};

use super::webhook_types::decode_event;

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new()
///     .with_line_items("cs_1", vec![item])
///     .with_product(product)
///     .with_method_error("deactivate_payment_link", PaymentError::network("timeout"));
///
/// // ... run the handler ...
///
/// assert!(mock.was_called("update_customer_shipping"));
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Line items by checkout session ID.
    line_items: HashMap<String, Vec<ProviderLineItem>>,

    /// Catalog products by ID.
    products: HashMap<String, ProviderProduct>,

    /// Subscriptions by ID.
    subscriptions: HashMap<String, ProviderSubscription>,

    /// Errors by method name; returned on every call.
    method_errors: HashMap<String, PaymentError>,

    /// `get_product` errors by product ID.
    product_errors: HashMap<String, PaymentError>,

    /// Shipping details written to customers, in call order.
    shipping_updates: Vec<(String, ShippingDetails)>,

    /// Error returned by `verify_webhook`, if set.
    webhook_rejection: Option<WebhookError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Registers the line items of a checkout session.
    pub fn with_line_items(self, session_id: &str, items: Vec<ProviderLineItem>) -> Self {
        self.state().line_items.insert(session_id.to_string(), items);
        self
    }

    /// Adds a product to the catalog.
    pub fn with_product(self, product: ProviderProduct) -> Self {
        self.state().products.insert(product.id.clone(), product);
        self
    }

    /// Adds a subscription.
    pub fn with_subscription(self, subscription: ProviderSubscription) -> Self {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
        self
    }

    /// Makes `get_product` fail for one product only.
    pub fn fail_product_lookup(self, product_id: &str, error: PaymentError) -> Self {
        self.state()
            .product_errors
            .insert(product_id.to_string(), error);
        self
    }

    /// Makes every call to `method` fail with `error`.
    pub fn with_method_error(self, method: &str, error: PaymentError) -> Self {
        self.state().method_errors.insert(method.to_string(), error);
        self
    }

    /// Makes webhook verification fail with `error`.
    pub fn reject_webhooks(self, error: WebhookError) -> Self {
        self.state().webhook_rejection = Some(error);
        self
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.method_errors.clear();
        state.product_errors.clear();
        state.webhook_rejection = None;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Count calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Shipping details written via `update_customer_shipping`.
    pub fn shipping_updates(&self) -> Vec<(String, ShippingDetails)> {
        self.state().shipping_updates.clone()
    }

    /// Records the call and returns the configured method error, if any.
    fn record(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        match state.method_errors.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        {
            let mut state = self.state();
            state.call_log.push(MethodCall {
                method: "verify_webhook".to_string(),
                args: vec![signature.to_string()],
            });
            if let Some(err) = &state.webhook_rejection {
                return Err(err.clone());
            }
        }

        let event: StripeEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        decode_event(event)
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<ProviderLineItem>, PaymentError> {
        self.record("list_checkout_line_items", vec![session_id.to_string()])?;
        self.state()
            .line_items
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Checkout session"))
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<ProviderProduct>, PaymentError> {
        self.record("get_product", vec![product_id.to_string()])?;
        let state = self.state();
        if let Some(err) = state.product_errors.get(product_id) {
            return Err(err.clone());
        }
        Ok(state.products.get(product_id).cloned())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        self.record("get_subscription", vec![subscription_id.to_string()])?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn update_customer_shipping(
        &self,
        customer_id: &str,
        shipping: &ShippingDetails,
    ) -> Result<(), PaymentError> {
        self.record(
            "update_customer_shipping",
            vec![customer_id.to_string(), shipping.name.clone()],
        )?;
        self.state()
            .shipping_updates
            .push((customer_id.to_string(), shipping.clone()));
        Ok(())
    }

    async fn deactivate_payment_link(&self, payment_link_id: &str) -> Result<(), PaymentError> {
        self.record("deactivate_payment_link", vec![payment_link_id.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{WebhookEventType, WebhookPayload};

    fn product(id: &str) -> ProviderProduct {
        ProviderProduct {
            id: id.to_string(),
            name: Some("Sencha".to_string()),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let mock = MockPaymentProvider::new();

        let err = mock.list_checkout_line_items("cs_missing").await.unwrap_err();

        assert_eq!(err.code, crate::ports::PaymentErrorCode::NotFound);
        assert!(mock.was_called("list_checkout_line_items"));
    }

    #[tokio::test]
    async fn product_errors_are_per_product() {
        let mock = MockPaymentProvider::new()
            .with_product(product("prod_a"))
            .fail_product_lookup("prod_b", PaymentError::network("timeout"));

        assert!(mock.get_product("prod_a").await.unwrap().is_some());
        assert!(mock.get_product("prod_b").await.is_err());
        assert!(mock.get_product("prod_c").await.unwrap().is_none());
        assert_eq!(mock.call_count("get_product"), 3);
    }

    #[tokio::test]
    async fn method_errors_persist_until_cleared() {
        let mock = MockPaymentProvider::new()
            .with_method_error("deactivate_payment_link", PaymentError::network("reset"));

        assert!(mock.deactivate_payment_link("plink_1").await.is_err());
        assert!(mock.deactivate_payment_link("plink_1").await.is_err());
        mock.clear_errors();
        assert!(mock.deactivate_payment_link("plink_1").await.is_ok());
    }

    #[tokio::test]
    async fn unsigned_webhook_is_decoded() {
        let mock = MockPaymentProvider::new();
        let payload = br#"{
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "created": 1704067200,
            "data": { "object": { "id": "sub_1", "customer": "cus_1", "status": "unpaid" } }
        }"#;

        let event = mock.verify_webhook(payload, "").await.unwrap();

        assert_eq!(event.event_type, WebhookEventType::SubscriptionUpdated);
        assert!(matches!(event.payload, WebhookPayload::Subscription(_)));
    }

    #[tokio::test]
    async fn rejection_is_returned_before_parsing() {
        let mock = MockPaymentProvider::new().reject_webhooks(WebhookError::TimestampOutOfRange);

        let err = mock.verify_webhook(b"not json", "t=1,v1=00").await.unwrap_err();

        assert!(matches!(err, WebhookError::TimestampOutOfRange));
    }
}
