//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod checkout;

pub use checkout::{
    resolve_product_details, shape_product_details, CompleteCheckoutCommand, CompleteCheckoutHandler,
    CompleteCheckoutResult, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandlePaymentWebhookResult, HandleSubscriptionEventCommand, HandleSubscriptionEventHandler,
    HandleSubscriptionEventResult,
};
