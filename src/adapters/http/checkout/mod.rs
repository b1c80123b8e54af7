//! HTTP adapter for checkout endpoints.
//!
//! - `POST /webhooks/stripe` - Handle Stripe webhooks
//! - `GET /health` - Liveness check

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAckResponse};
pub use handlers::{CheckoutAppState, WebhookApiError, STRIPE_SIGNATURE_HEADER};
pub use routes::{checkout_router, webhook_routes};
