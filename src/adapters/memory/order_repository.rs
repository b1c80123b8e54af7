//! In-memory order repository.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::checkout::{
    ItemPaymentLinkage, LineItem, Order, PaymentLinkage, SagaStep, SubscriptionLinkage,
};
use crate::domain::foundation::{DomainError, ErrorCode, LineItemId, OrderId};
use crate::ports::OrderRepository;

/// Repository operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderOperation {
    CreateOrder,
    DeleteOrder,
    CreatePaymentLinkage,
    DeletePaymentLinkage,
    CreateLineItems,
    DeleteLineItems,
    CreateSubscriptionLinkages,
    DeleteSubscriptionLinkages,
    CreateItemPaymentLinkages,
    DeleteItemPaymentLinkages,
    RecordFulfillmentStep,
}

/// Point-in-time copy of every stored record.
#[derive(Debug, Clone, Default)]
pub struct OrderSnapshot {
    pub orders: Vec<Order>,
    pub payment_linkages: Vec<PaymentLinkage>,
    pub line_items: Vec<LineItem>,
    pub subscription_linkages: Vec<SubscriptionLinkage>,
    pub item_payment_linkages: Vec<ItemPaymentLinkage>,
    pub fulfillment_steps: Vec<(OrderId, SagaStep)>,
}

impl OrderSnapshot {
    /// True when no record of any kind is stored.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
            && self.payment_linkages.is_empty()
            && self.line_items.is_empty()
            && self.subscription_linkages.is_empty()
            && self.item_payment_linkages.is_empty()
            && self.fulfillment_steps.is_empty()
    }
}

#[derive(Default)]
struct State {
    records: OrderSnapshot,
    failing: HashSet<OrderOperation>,
}

/// In-memory `OrderRepository` with per-operation failure injection.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    state: RwLock<State>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call to `operation` fail.
    pub async fn fail_on(&self, operation: OrderOperation) {
        self.state.write().await.failing.insert(operation);
    }

    /// Lets `operation` succeed again.
    pub async fn recover(&self, operation: OrderOperation) {
        self.state.write().await.failing.remove(&operation);
    }

    pub async fn snapshot(&self) -> OrderSnapshot {
        self.state.read().await.records.clone()
    }
}

fn check(state: &State, operation: OrderOperation) -> Result<(), DomainError> {
    if state.failing.contains(&operation) {
        return Err(DomainError::database(format!("{:?} failed", operation)));
    }
    Ok(())
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_order_by_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let state = self.state.read().await;
        let order_id = state
            .records
            .payment_linkages
            .iter()
            .find(|l| l.checkout_session_id == checkout_session_id)
            .map(|l| l.order_id);
        Ok(order_id.and_then(|id| state.records.orders.iter().find(|o| o.id == id).cloned()))
    }

    async fn create_order(&self, order: &Order) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::CreateOrder)?;
        if state.records.orders.iter().any(|o| o.id == order.id) {
            return Err(DomainError::new(ErrorCode::Conflict, "order already exists"));
        }
        state.records.orders.push(order.clone());
        Ok(())
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::DeleteOrder)?;
        state.records.orders.retain(|o| o.id != *id);
        Ok(())
    }

    async fn create_payment_linkage(&self, linkage: &PaymentLinkage) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::CreatePaymentLinkage)?;
        if state
            .records
            .payment_linkages
            .iter()
            .any(|l| l.checkout_session_id == linkage.checkout_session_id)
        {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "payment linkage already exists for checkout session",
            )
            .with_detail("checkout_session_id", &linkage.checkout_session_id));
        }
        state.records.payment_linkages.push(linkage.clone());
        Ok(())
    }

    async fn delete_payment_linkage(&self, order_id: &OrderId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::DeletePaymentLinkage)?;
        state.records.payment_linkages.retain(|l| l.order_id != *order_id);
        Ok(())
    }

    async fn create_line_items(&self, items: &[LineItem]) -> Result<Vec<LineItemId>, DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::CreateLineItems)?;
        state.records.line_items.extend_from_slice(items);
        Ok(items.iter().map(|item| item.id).collect())
    }

    async fn delete_line_items(&self, order_id: &OrderId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::DeleteLineItems)?;
        state.records.line_items.retain(|item| item.order_id != *order_id);
        Ok(())
    }

    async fn create_subscription_linkages(
        &self,
        linkages: &[SubscriptionLinkage],
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::CreateSubscriptionLinkages)?;
        state.records.subscription_linkages.extend_from_slice(linkages);
        Ok(())
    }

    async fn delete_subscription_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::DeleteSubscriptionLinkages)?;
        state
            .records
            .subscription_linkages
            .retain(|l| !line_item_ids.contains(&l.line_item_id));
        Ok(())
    }

    async fn create_item_payment_linkages(
        &self,
        linkages: &[ItemPaymentLinkage],
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::CreateItemPaymentLinkages)?;
        state.records.item_payment_linkages.extend_from_slice(linkages);
        Ok(())
    }

    async fn delete_item_payment_linkages(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::DeleteItemPaymentLinkages)?;
        state
            .records
            .item_payment_linkages
            .retain(|l| !line_item_ids.contains(&l.line_item_id));
        Ok(())
    }

    async fn completed_fulfillment_steps(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<SagaStep>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .fulfillment_steps
            .iter()
            .filter(|(id, _)| id == order_id)
            .map(|(_, step)| *step)
            .collect())
    }

    async fn record_fulfillment_step(
        &self,
        order_id: &OrderId,
        step: SagaStep,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        check(&state, OrderOperation::RecordFulfillmentStep)?;
        let entry = (*order_id, step);
        if !state.records.fulfillment_steps.contains(&entry) {
            state.records.fulfillment_steps.push(entry);
        }
        Ok(())
    }
}
