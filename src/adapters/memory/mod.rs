//! In-memory adapters.
//!
//! Implementations of the storage and notification ports backed by
//! `tokio::sync::RwLock`-guarded collections, for unit and integration
//! tests.
//!
//! Each adapter exposes inspection helpers (`snapshot`, `all`, ...) and
//! failure injection (`fail_on`, `fail_writes`) for exercising the saga's
//! compensation paths.

mod inventory_repository;
mod notification_sender;
mod order_repository;
mod shipping_address_repository;
mod subscription_payment_repository;
mod webhook_event_repository;

pub use inventory_repository::InMemoryInventoryRepository;
pub use notification_sender::{NotificationKind, RecordingNotificationSender};
pub use order_repository::{InMemoryOrderRepository, OrderOperation, OrderSnapshot};
pub use shipping_address_repository::InMemoryShippingAddressRepository;
pub use subscription_payment_repository::InMemorySubscriptionPaymentRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
