//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration, including:
//! - Checkout session line items
//! - Product and subscription lookups
//! - Customer shipping updates and payment link deactivation
//! - Webhook signature verification and event decoding
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! Required settings (see `config::PaymentConfig`):
//! - `STOREFRONT__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `STOREFRONT__PAYMENT__STRIPE_WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
pub use webhook_types::{
    decode_event, StripeCheckoutSession, StripeLineItem, StripeList, StripeProduct,
    StripeSubscription, USER_ID_METADATA_KEY,
};
