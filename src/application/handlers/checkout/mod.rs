//! Checkout handlers.
//!
//! ## Commands
//! - Completing a checkout session (order creation saga)
//! - Processing a subscription status change
//! - Processing a payment webhook delivery (verification, ledger, dispatch)
//!
//! ## Helpers
//! - Shaping provider line items into product details

mod complete_checkout;
mod handle_payment_webhook;
mod handle_subscription_event;
mod product_details;

pub use complete_checkout::{
    CompleteCheckoutCommand, CompleteCheckoutHandler, CompleteCheckoutResult,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use handle_subscription_event::{
    HandleSubscriptionEventCommand, HandleSubscriptionEventHandler, HandleSubscriptionEventResult,
};
pub use product_details::{resolve_product_details, resolve_products, shape_product_details};
