//! Webhook module - authenticating and decoding provider deliveries.

mod errors;
mod event;
mod verifier;

pub use errors::WebhookError;
pub use event::{StripeEvent, StripeEventData, StripeEventType};
pub use verifier::{sign_payload, SignatureHeader, StripeWebhookVerifier};
