//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresOrderRepository` - Order graph create/delete pairs
//! - `PostgresInventoryRepository` - Transactional stock adjustment
//! - `PostgresShippingAddressRepository` - Default delivery addresses
//! - `PostgresSubscriptionPaymentRepository` - Subscription lifecycle log
//! - `PostgresWebhookEventRepository` - Webhook delivery ledger
//!
//! Schema lives in `migrations/`.

mod inventory_repository;
mod order_repository;
mod shipping_address_repository;
mod subscription_payment_repository;
mod webhook_event_repository;

pub use inventory_repository::PostgresInventoryRepository;
pub use order_repository::PostgresOrderRepository;
pub use shipping_address_repository::PostgresShippingAddressRepository;
pub use subscription_payment_repository::PostgresSubscriptionPaymentRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
