//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps and error types that the checkout and webhook
//! modules build on.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{LineItemId, OrderId, ProductId, ShippingAddressId, SubscriptionPaymentId, UserId};
pub use timestamp::Timestamp;
