//! Payment provider port.
//!
//! Defines the contract for the payment gateway (Stripe in production).
//! The checkout handlers only read sessions, products and subscriptions,
//! push shipping details back to the customer record and retire payment
//! links. Webhook authentication also goes through this port so tests can
//! substitute a provider that accepts unsigned events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::checkout::{Recurrence, ShippingDetails, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::webhook::WebhookError;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Authenticates a webhook delivery and decodes it.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, WebhookError>;

    /// Lists the line items of a checkout session, expanded with price data.
    async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<ProviderLineItem>, PaymentError>;

    /// Gets a catalog product. `None` if the provider does not know it.
    async fn get_product(&self, product_id: &str) -> Result<Option<ProviderProduct>, PaymentError>;

    /// Gets the current state of a subscription, including its items.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError>;

    /// Writes shipping details onto the provider's customer record.
    async fn update_customer_shipping(
        &self,
        customer_id: &str,
        shipping: &ShippingDetails,
    ) -> Result<(), PaymentError>;

    /// Deactivates a payment link so it cannot be paid again.
    async fn deactivate_payment_link(&self, payment_link_id: &str) -> Result<(), PaymentError>;
}

/// A completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: String,
    pub payment_intent_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub payment_link_id: Option<String>,
    /// Authoritative total, minor units.
    pub amount_total: i64,
    pub shipping_amount: i64,
    pub currency: String,
    pub payment_status: String,
    pub payment_method_types: Vec<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub shipping: Option<ShippingDetails>,
    /// Storefront user, from `metadata.user_id` or `client_reference_id`.
    pub user_id: Option<String>,
}

impl CheckoutSession {
    pub fn is_subscription(&self) -> bool {
        self.subscription_id.is_some() || self.mode == "subscription"
    }
}

/// A session or subscription line item with its price expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLineItem {
    pub id: String,
    pub price_id: String,
    pub product_id: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub quantity: u32,
    pub amount_total: i64,
    pub recurring: Option<Recurrence>,
}

/// A catalog product as the provider stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    pub name: Option<String>,
    pub images: Vec<String>,
}

/// Current subscription state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    /// Present when the customer object was expanded.
    pub customer_email: Option<String>,
    pub status: SubscriptionStatus,
    pub items: Vec<ProviderLineItem>,
    /// From `metadata.user_id`.
    pub user_id: Option<String>,
}

/// Authenticated webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: WebhookEventType,
    pub created_at: i64,
    pub livemode: bool,
    pub payload: WebhookPayload,
    /// Original event JSON, kept for the webhook ledger.
    pub raw: serde_json::Value,
}

/// Event types the storefront distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    CheckoutSessionCompleted,
    SubscriptionUpdated,
    Unknown(String),
}

impl WebhookEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::CheckoutSessionCompleted => "checkout.session.completed",
            WebhookEventType::SubscriptionUpdated => "customer.subscription.updated",
            WebhookEventType::Unknown(s) => s.as_str(),
        }
    }
}

/// Decoded event object.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    CheckoutSession(CheckoutSession),
    Subscription(ProviderSubscription),
    Unrecognized,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's own error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::ProductNotFound,
            _ => ErrorCode::PaymentProviderError,
        };
        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    NotFound,
    RateLimitExceeded,
    InvalidRequest,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }

    /// Maps a provider HTTP status to an error code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            400..=499 => PaymentErrorCode::InvalidRequest,
            _ => PaymentErrorCode::ProviderError,
        }
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
