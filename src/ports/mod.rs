//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application handlers and the outside world. Adapters implement
//! these ports and are injected as `Arc<dyn Port>`.
//!
//! ## Storage Ports
//!
//! - `OrderRepository` - Order graph create/delete pairs
//! - `InventoryRepository` - Stock and sold-count bookkeeping
//! - `ShippingAddressRepository` - Default delivery addresses
//! - `SubscriptionPaymentRepository` - Subscription lifecycle log
//! - `WebhookEventRepository` - Webhook delivery ledger
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Payment gateway reads and webhook verification
//! - `NotificationSender` - Transactional emails

mod inventory_repository;
mod notification_sender;
mod order_repository;
mod payment_provider;
mod shipping_address_repository;
mod subscription_payment_repository;
mod webhook_event_repository;

pub use inventory_repository::InventoryRepository;
pub use notification_sender::{
    NotificationSender, OrderConfirmation, PaymentRequest, SubscriptionPaymentRequest,
};
pub use order_repository::OrderRepository;
pub use payment_provider::{
    CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider, ProviderLineItem,
    ProviderProduct, ProviderSubscription, WebhookEvent, WebhookEventType, WebhookPayload,
};
pub use shipping_address_repository::ShippingAddressRepository;
pub use subscription_payment_repository::SubscriptionPaymentRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome,
};
