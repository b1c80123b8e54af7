//! OrderRepository port - create/delete pairs for the order graph.
//!
//! Every create has a matching delete so the checkout saga can unwind a
//! partially written order. Deletes are idempotent: deleting something that
//! does not exist is a success.
//!
//! The repository also keeps which post-commit steps finished for an order,
//! so a redelivered session resumes where the last attempt stopped.

use async_trait::async_trait;

use crate::domain::checkout::{
    ItemPaymentLinkage, LineItem, Order, PaymentLinkage, SagaStep, SubscriptionLinkage,
};
use crate::domain::foundation::{DomainError, LineItemId, OrderId};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Finds the order already created for a checkout session, if any.
    async fn find_order_by_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Order>, DomainError>;

    async fn create_order(&self, order: &Order) -> Result<(), DomainError>;

    async fn delete_order(&self, id: &OrderId) -> Result<(), DomainError>;

    /// Fails if a linkage for the same checkout session exists.
    async fn create_payment_linkage(&self, linkage: &PaymentLinkage) -> Result<(), DomainError>;

    async fn delete_payment_linkage(&self, order_id: &OrderId) -> Result<(), DomainError>;

    /// Creates the batch and returns the stored ids in input order.
    async fn create_line_items(&self, items: &[LineItem]) -> Result<Vec<LineItemId>, DomainError>;

    async fn delete_line_items(&self, order_id: &OrderId) -> Result<(), DomainError>;

    async fn create_subscription_linkages(
        &self,
        linkages: &[SubscriptionLinkage],
    ) -> Result<(), DomainError>;

    async fn delete_subscription_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError>;

    async fn create_item_payment_linkages(
        &self,
        linkages: &[ItemPaymentLinkage],
    ) -> Result<(), DomainError>;

    async fn delete_item_payment_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError>;

    /// Post-commit steps already completed for the order.
    async fn completed_fulfillment_steps(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<SagaStep>, DomainError>;

    /// Marks a post-commit step as completed. Recording twice is a no-op.
    async fn record_fulfillment_step(
        &self,
        order_id: &OrderId,
        step: SagaStep,
    ) -> Result<(), DomainError>;
}
