//! Checkout module - the order graph a completed payment produces.
//!
//! Contains the order aggregate and its satellite records, subscription
//! status mapping, and the step runner that creates them with
//! compensation on failure.

mod errors;
mod line_item;
mod linkage;
mod order;
mod product_detail;
mod saga;
mod shipping;
mod subscription;

pub use errors::{CheckoutError, CompensationFailure};
pub use line_item::{LineItem, StockAdjustment};
pub use linkage::{ItemPaymentLinkage, PaymentLinkage, SubscriptionLinkage};
pub use order::{order_number, Order, OrderStatus, PaymentMethod};
pub use product_detail::ProductDetail;
pub use saga::{Compensation, Saga, SagaStep};
pub use shipping::{PostalAddress, ShippingAddress, ShippingDetails};
pub use subscription::{BillingInterval, Recurrence, SubscriptionPayment, SubscriptionStatus};

/// Title used when a product lookup yields no name.
pub const PLACEHOLDER_PRODUCT_TITLE: &str = "Unknown product";
