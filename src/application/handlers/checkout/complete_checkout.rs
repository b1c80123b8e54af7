//! CompleteCheckoutHandler - turns a completed checkout session into an order.
//!
//! Steps 2-6 write the order graph under a [`Saga`]: any failure unwinds
//! the records already written, so either the whole graph exists or none of
//! it does. Step 7 is the commit point. From there on failures are reported
//! as [`CheckoutError::CommitPointFailed`] and the order stays in place.
//! Each post-commit step is recorded once it finishes, so a redelivery of
//! the same session runs only the steps still outstanding.

use std::sync::Arc;

use futures::FutureExt;

use crate::domain::checkout::{
    CheckoutError, ItemPaymentLinkage, LineItem, Order, OrderStatus, PaymentLinkage,
    PaymentMethod, ProductDetail, Saga, SagaStep, ShippingAddress, StockAdjustment,
    SubscriptionLinkage, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, LineItemId, OrderId, ProductId, Timestamp, UserId, ValidationError,
};
use crate::ports::{
    CheckoutSession, InventoryRepository, NotificationSender, OrderConfirmation, OrderRepository,
    PaymentProvider, PaymentRequest, ShippingAddressRepository,
};

use super::product_details::resolve_product_details;

/// Command to complete a checkout session.
#[derive(Debug, Clone)]
pub struct CompleteCheckoutCommand {
    /// Provider event that reported the session, for log correlation.
    pub event_id: String,
    pub session: CheckoutSession,
}

/// Result of checkout completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteCheckoutResult {
    /// The order graph was created and every side effect ran.
    OrderCreated {
        order_id: OrderId,
        order_number: String,
        line_items: usize,
        subscription_linkages: usize,
    },
    /// An order already exists for this session and every side effect ran;
    /// nothing was done.
    AlreadyFulfilled { order_id: OrderId, order_number: String },
    /// An order already existed; the side effects an earlier delivery left
    /// undone were run.
    Resumed {
        order_id: OrderId,
        order_number: String,
        steps: Vec<SagaStep>,
    },
}

/// Handler for completed checkout sessions.
pub struct CompleteCheckoutHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    orders: Arc<dyn OrderRepository>,
    inventory: Arc<dyn InventoryRepository>,
    shipping_addresses: Arc<dyn ShippingAddressRepository>,
    notifications: Arc<dyn NotificationSender>,
}

impl CompleteCheckoutHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        orders: Arc<dyn OrderRepository>,
        inventory: Arc<dyn InventoryRepository>,
        shipping_addresses: Arc<dyn ShippingAddressRepository>,
        notifications: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            payment_provider,
            orders,
            inventory,
            shipping_addresses,
            notifications,
        }
    }

    pub async fn handle(
        &self,
        cmd: CompleteCheckoutCommand,
    ) -> Result<CompleteCheckoutResult, CheckoutError> {
        let session = &cmd.session;

        // 0. Reject sessions we cannot attribute
        let user_id = session
            .user_id
            .as_deref()
            .ok_or_else(|| CheckoutError::InvalidEvent("session has no user id".to_string()))
            .and_then(|id| UserId::new(id).map_err(invalid_event))?;
        let customer_email = session
            .customer_email
            .clone()
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                CheckoutError::InvalidEvent("session has no customer email".to_string())
            })?;

        // A session that already has an order skips straight past the commit point
        let existing = self
            .orders
            .find_order_by_session(&session.id)
            .await
            .map_err(|e| CheckoutError::step_failed(SagaStep::CreateOrder, e.to_string()))?;
        if let Some(order) = existing {
            return self.resume(&cmd, order, &customer_email).await;
        }

        let mut saga = Saga::new("checkout");

        // 1. Resolve line items and product metadata
        let products = self.resolve_line_items(&mut saga, session).await?;

        let status = OrderStatus::from_payment_status(&session.payment_status);
        let payment_method = session
            .payment_method_types
            .first()
            .map(|m| PaymentMethod::from_provider(m))
            .unwrap_or_else(|| PaymentMethod::Other("unknown".to_string()));
        let order = Order::new(
            user_id,
            status,
            session.amount_total,
            session.shipping_amount,
            session.currency.clone(),
            payment_method,
            Timestamp::now(),
        );
        let line_items = build_line_items(order.id, &products).map_err(invalid_event)?;
        let order_id = order.id;

        tracing::info!(
            event_id = %cmd.event_id,
            session_id = %session.id,
            %order_id,
            order_number = %order.order_number,
            items = line_items.len(),
            "creating order"
        );

        // 2. Order
        saga.execute(SagaStep::CreateOrder, self.orders.create_order(&order), |_| {
            let orders = self.orders.clone();
            async move { orders.delete_order(&order_id).await }.boxed()
        })
        .await?;

        // 3. Payment linkage
        let payment_linkage = PaymentLinkage {
            order_id,
            checkout_session_id: session.id.clone(),
            payment_intent_id: session.payment_intent_id.clone(),
            created_at: order.created_at,
        };
        saga.execute(
            SagaStep::CreatePaymentLinkage,
            self.orders.create_payment_linkage(&payment_linkage),
            |_| {
                let orders = self.orders.clone();
                async move { orders.delete_payment_linkage(&order_id).await }.boxed()
            },
        )
        .await?;

        // 4. Line items
        let line_item_ids = saga
            .execute(
                SagaStep::CreateLineItems,
                self.orders.create_line_items(&line_items),
                |_| {
                    let orders = self.orders.clone();
                    async move { orders.delete_line_items(&order_id).await }.boxed()
                },
            )
            .await?;
        if line_item_ids.len() != products.len() {
            let message = format!(
                "stored {} line items for {} products",
                line_item_ids.len(),
                products.len()
            );
            return Err(saga.abort(SagaStep::CreateLineItems, message).await);
        }

        // 5. Subscription linkages (only recurring items)
        let subscription_status = if status.is_paid() {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Incomplete
        };
        let subscription_linkages = build_subscription_linkages(
            session.subscription_id.as_deref(),
            &products,
            &line_item_ids,
            &subscription_status,
        );
        if !subscription_linkages.is_empty() {
            let linked: Vec<LineItemId> = subscription_linkages
                .iter()
                .map(|l| l.line_item_id)
                .collect();
            saga.execute(
                SagaStep::CreateSubscriptionLinkages,
                self.orders.create_subscription_linkages(&subscription_linkages),
                |_| {
                    let orders = self.orders.clone();
                    async move { orders.delete_subscription_linkages(&linked).await }.boxed()
                },
            )
            .await?;
        }

        // 6. Item payment linkages
        let item_payment_linkages: Vec<ItemPaymentLinkage> = products
            .iter()
            .zip(&line_item_ids)
            .map(|(product, id)| ItemPaymentLinkage {
                line_item_id: *id,
                price_id: product.price_id.clone(),
            })
            .collect();
        let priced = line_item_ids;
        saga.execute(
            SagaStep::CreateItemPaymentLinkages,
            self.orders.create_item_payment_linkages(&item_payment_linkages),
            |_| {
                let orders = self.orders.clone();
                async move { orders.delete_item_payment_linkages(&priced).await }.boxed()
            },
        )
        .await?;

        // 7-11. Commit point, then the side effects
        saga.commit();
        self.fulfill(session, &order, &customer_email, &products, &[]).await?;

        tracing::info!(
            event_id = %cmd.event_id,
            %order_id,
            order_number = %order.order_number,
            "checkout completed"
        );

        Ok(CompleteCheckoutResult::OrderCreated {
            order_id,
            order_number: order.order_number,
            line_items: line_items.len(),
            subscription_linkages: subscription_linkages.len(),
        })
    }

    /// Finishes the post-commit steps a previous delivery left undone.
    async fn resume(
        &self,
        cmd: &CompleteCheckoutCommand,
        order: Order,
        customer_email: &str,
    ) -> Result<CompleteCheckoutResult, CheckoutError> {
        let session = &cmd.session;
        let completed = self
            .orders
            .completed_fulfillment_steps(&order.id)
            .await
            .map_err(|e| commit_point_failure(&order, SagaStep::UpdateStock, e))?;
        let pending: Vec<SagaStep> = fulfillment_plan(order.status, session)
            .into_iter()
            .filter(|step| !completed.contains(step))
            .collect();

        if pending.is_empty() {
            tracing::warn!(
                event_id = %cmd.event_id,
                session_id = %session.id,
                order_id = %order.id,
                "checkout session already fulfilled, skipping"
            );
            return Ok(CompleteCheckoutResult::AlreadyFulfilled {
                order_id: order.id,
                order_number: order.order_number,
            });
        }

        tracing::info!(
            event_id = %cmd.event_id,
            session_id = %session.id,
            order_id = %order.id,
            pending = ?pending,
            "resuming checkout after commit point"
        );

        let needs_products = pending
            .iter()
            .any(|step| matches!(step, SagaStep::UpdateStock | SagaStep::SendOrderConfirmation));
        let products = if needs_products {
            let mut saga = Saga::new("checkout");
            self.resolve_line_items(&mut saga, session).await?
        } else {
            Vec::new()
        };

        let steps = self
            .fulfill(session, &order, customer_email, &products, &completed)
            .await?;

        Ok(CompleteCheckoutResult::Resumed {
            order_id: order.id,
            order_number: order.order_number,
            steps,
        })
    }

    async fn resolve_line_items(
        &self,
        saga: &mut Saga,
        session: &CheckoutSession,
    ) -> Result<Vec<ProductDetail>, CheckoutError> {
        let provider_items = saga
            .run(
                SagaStep::ResolveLineItems,
                self.payment_provider.list_checkout_line_items(&session.id),
            )
            .await?;
        if provider_items.is_empty() {
            return Err(saga
                .abort(SagaStep::ResolveLineItems, "checkout session has no line items")
                .await);
        }
        Ok(resolve_product_details(
            self.payment_provider.as_ref(),
            &provider_items,
            session.subscription_id.as_deref(),
        )
        .await)
    }

    /// Runs every post-commit step not in `completed`, recording each one
    /// as it finishes. Returns the steps that ran.
    async fn fulfill(
        &self,
        session: &CheckoutSession,
        order: &Order,
        customer_email: &str,
        products: &[ProductDetail],
        completed: &[SagaStep],
    ) -> Result<Vec<SagaStep>, CheckoutError> {
        let mut ran = Vec::new();
        for step in fulfillment_plan(order.status, session) {
            if completed.contains(&step) {
                continue;
            }
            let outcome = match step {
                SagaStep::UpdateStock => self.update_stock(order, products).await,
                SagaStep::PersistShippingAddress => {
                    self.persist_shipping_address(&order.user_id, session).await
                }
                SagaStep::SendOrderConfirmation => {
                    let confirmation = OrderConfirmation {
                        order_number: order.order_number.clone(),
                        customer_email: customer_email.to_string(),
                        customer_name: session.customer_name.clone(),
                        status: order.status,
                        payment_method: order.payment_method.clone(),
                        total_amount: order.total_amount,
                        shipping_fee: order.shipping_fee,
                        currency: order.currency.clone(),
                        products: products.to_vec(),
                        shipping: session.shipping.clone(),
                    };
                    self.notifications.send_order_confirmation(&confirmation).await
                }
                SagaStep::SendPaymentRequest => {
                    let request = PaymentRequest {
                        order_number: order.order_number.clone(),
                        customer_email: customer_email.to_string(),
                        customer_name: session.customer_name.clone(),
                        payment_method: order.payment_method.clone(),
                        amount: order.total_amount,
                        currency: order.currency.clone(),
                    };
                    self.notifications.send_payment_request(&request).await
                }
                SagaStep::DeactivatePaymentLink => match &session.payment_link_id {
                    Some(link_id) => self
                        .payment_provider
                        .deactivate_payment_link(link_id)
                        .await
                        .map_err(DomainError::from),
                    None => Ok(()),
                },
                _ => Ok(()),
            };
            outcome.map_err(|e| commit_point_failure(order, step, e))?;

            if let Err(e) = self.orders.record_fulfillment_step(&order.id, step).await {
                tracing::error!(
                    order_id = %order.id,
                    %step,
                    error = %e,
                    "failed to record fulfillment step, a redelivery may repeat it"
                );
            }
            ran.push(step);
        }
        Ok(ran)
    }

    async fn update_stock(
        &self,
        order: &Order,
        products: &[ProductDetail],
    ) -> Result<(), DomainError> {
        let adjustments: Vec<StockAdjustment> = build_line_items(order.id, products)?
            .iter()
            .map(StockAdjustment::from)
            .collect();
        self.inventory.update_stock_and_sold_count(&adjustments).await
    }

    /// Stores the checkout address as the user's default unless one exists,
    /// then mirrors it onto the provider customer.
    async fn persist_shipping_address(
        &self,
        user_id: &UserId,
        session: &CheckoutSession,
    ) -> Result<(), DomainError> {
        let Some(details) = &session.shipping else {
            return Ok(());
        };
        if self.shipping_addresses.find_default(user_id).await?.is_some() {
            return Ok(());
        }

        let address = ShippingAddress::default_from(user_id.clone(), details, Timestamp::now());
        self.shipping_addresses.create(&address).await?;
        tracing::info!(%user_id, address_id = %address.id, "stored default shipping address");

        if let Some(customer_id) = &session.customer_id {
            self.payment_provider
                .update_customer_shipping(customer_id, details)
                .await?;
        }
        Ok(())
    }
}

/// Post-commit steps that apply to a session, in execution order.
fn fulfillment_plan(status: OrderStatus, session: &CheckoutSession) -> Vec<SagaStep> {
    let mut plan = vec![
        SagaStep::UpdateStock,
        SagaStep::PersistShippingAddress,
        SagaStep::SendOrderConfirmation,
    ];
    if !status.is_paid() && !session.is_subscription() {
        plan.push(SagaStep::SendPaymentRequest);
    }
    if session.payment_link_id.is_some() && !session.is_subscription() {
        plan.push(SagaStep::DeactivatePaymentLink);
    }
    plan
}

fn invalid_event(err: ValidationError) -> CheckoutError {
    CheckoutError::InvalidEvent(err.to_string())
}

fn commit_point_failure(order: &Order, step: SagaStep, err: DomainError) -> CheckoutError {
    tracing::error!(
        order_id = %order.id,
        order_number = %order.order_number,
        %step,
        error = %err,
        "checkout failed after commit point, order kept for redelivery to resume"
    );
    CheckoutError::commit_point_failed(step, err.to_string())
}

fn build_line_items(
    order_id: OrderId,
    products: &[ProductDetail],
) -> Result<Vec<LineItem>, ValidationError> {
    products
        .iter()
        .map(|product| {
            let remarks = product
                .recurring
                .map(|r| r.describe())
                .unwrap_or_default();
            LineItem::new(
                order_id,
                ProductId::new(product.product_id.clone())?,
                product.unit_amount,
                product.quantity,
                remarks,
            )
        })
        .collect()
}

fn build_subscription_linkages(
    subscription_id: Option<&str>,
    products: &[ProductDetail],
    line_item_ids: &[LineItemId],
    status: &SubscriptionStatus,
) -> Vec<SubscriptionLinkage> {
    let Some(subscription_id) = subscription_id else {
        return Vec::new();
    };
    products
        .iter()
        .zip(line_item_ids)
        .filter_map(|(product, id)| {
            product.recurring.map(|recurrence| SubscriptionLinkage {
                line_item_id: *id,
                subscription_id: subscription_id.to_string(),
                status: status.clone(),
                interval: recurrence.interval,
                interval_count: recurrence.interval_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryInventoryRepository, InMemoryOrderRepository, InMemoryShippingAddressRepository,
        NotificationKind, OrderOperation, RecordingNotificationSender,
    };
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::checkout::{BillingInterval, PostalAddress, Recurrence, ShippingDetails};
    use crate::ports::{PaymentError, ProviderLineItem, ProviderProduct};

    struct Fixture {
        provider: Arc<MockPaymentProvider>,
        orders: Arc<InMemoryOrderRepository>,
        inventory: Arc<InMemoryInventoryRepository>,
        addresses: Arc<InMemoryShippingAddressRepository>,
        notifications: Arc<RecordingNotificationSender>,
    }

    impl Fixture {
        fn new(provider: MockPaymentProvider) -> Self {
            Self {
                provider: Arc::new(provider),
                orders: Arc::new(InMemoryOrderRepository::new()),
                inventory: Arc::new(InMemoryInventoryRepository::with_stock([
                    ("prod_tea", 10),
                    ("prod_club", 100),
                ])),
                addresses: Arc::new(InMemoryShippingAddressRepository::new()),
                notifications: Arc::new(RecordingNotificationSender::new()),
            }
        }

        fn handler(&self) -> CompleteCheckoutHandler {
            self.handler_with(self.provider.clone())
        }

        /// Handler over the same stores but a different provider.
        fn handler_with(&self, provider: Arc<MockPaymentProvider>) -> CompleteCheckoutHandler {
            CompleteCheckoutHandler::new(
                provider,
                self.orders.clone(),
                self.inventory.clone(),
                self.addresses.clone(),
                self.notifications.clone(),
            )
        }
    }

    fn line_item(product_id: &str, unit_amount: i64, recurring: Option<Recurrence>) -> ProviderLineItem {
        ProviderLineItem {
            id: format!("li_{}", product_id),
            price_id: format!("price_{}", product_id),
            product_id: product_id.to_string(),
            description: None,
            unit_amount,
            quantity: 1,
            amount_total: unit_amount,
            recurring,
        }
    }

    fn product(id: &str, name: &str) -> ProviderProduct {
        ProviderProduct {
            id: id.to_string(),
            name: Some(name.to_string()),
            images: vec![],
        }
    }

    fn provider_with_items(items: Vec<ProviderLineItem>) -> MockPaymentProvider {
        MockPaymentProvider::new()
            .with_line_items("cs_1", items)
            .with_product(product("prod_tea", "Sencha"))
            .with_product(product("prod_club", "Tea Club"))
    }

    fn session() -> CheckoutSession {
        CheckoutSession {
            id: "cs_1".to_string(),
            mode: "payment".to_string(),
            payment_intent_id: Some("pi_1".to_string()),
            subscription_id: None,
            customer_id: Some("cus_1".to_string()),
            payment_link_id: None,
            amount_total: 1500,
            shipping_amount: 500,
            currency: "jpy".to_string(),
            payment_status: "paid".to_string(),
            payment_method_types: vec!["card".to_string()],
            customer_email: Some("buyer@example.com".to_string()),
            customer_name: Some("Aiko".to_string()),
            shipping: Some(ShippingDetails {
                name: "Aiko".to_string(),
                phone: None,
                address: PostalAddress {
                    line1: Some("1-2-3 Shibuya".to_string()),
                    country: Some("JP".to_string()),
                    ..Default::default()
                },
            }),
            user_id: Some("user_1".to_string()),
        }
    }

    fn command(session: CheckoutSession) -> CompleteCheckoutCommand {
        CompleteCheckoutCommand {
            event_id: "evt_1".to_string(),
            session,
        }
    }

    fn monthly() -> Option<Recurrence> {
        Some(Recurrence {
            interval: BillingInterval::Month,
            interval_count: 1,
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Happy path
    // ═══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_session_creates_full_graph_and_confirms() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));

        let result = fx.handler().handle(command(session())).await.unwrap();

        let (order_id, line_items) = match result {
            CompleteCheckoutResult::OrderCreated { order_id, line_items, .. } => (order_id, line_items),
            other => panic!("Expected OrderCreated, got {:?}", other),
        };
        assert_eq!(line_items, 1);
        let snapshot = fx.orders.snapshot().await;
        assert_eq!(snapshot.orders.len(), 1);
        assert_eq!(snapshot.orders[0].id, order_id);
        assert_eq!(snapshot.orders[0].total_amount, 1500);
        assert_eq!(snapshot.payment_linkages.len(), 1);
        assert_eq!(snapshot.item_payment_linkages.len(), 1);
        assert_eq!(snapshot.item_payment_linkages[0].price_id, "price_prod_tea");
        assert_eq!(fx.inventory.stock_of("prod_tea").await, Some(9));
        assert_eq!(fx.notifications.confirmations().await.len(), 1);
        assert!(fx.notifications.payment_requests().await.is_empty());
    }

    #[tokio::test]
    async fn line_item_amounts_and_remarks_follow_prices() {
        let mut item = line_item("prod_club", 800, monthly());
        item.quantity = 2;
        let fx = Fixture::new(provider_with_items(vec![item]));
        let mut s = session();
        s.subscription_id = Some("sub_1".to_string());
        s.mode = "subscription".to_string();

        fx.handler().handle(command(s)).await.unwrap();

        let snapshot = fx.orders.snapshot().await;
        assert_eq!(snapshot.line_items[0].amount, 1600);
        assert_eq!(snapshot.line_items[0].remarks, "every month");
        assert_eq!(snapshot.subscription_linkages[0].status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn existing_default_address_is_left_alone() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        let user = UserId::new("user_1").unwrap();
        let details = session().shipping.unwrap();
        fx.addresses
            .create(&ShippingAddress::default_from(user.clone(), &details, Timestamp::now()))
            .await
            .unwrap();

        fx.handler().handle(command(session())).await.unwrap();

        assert_eq!(fx.addresses.count_for(&user).await, 1);
        assert!(!fx.provider.was_called("update_customer_shipping"));
    }

    #[tokio::test]
    async fn new_default_address_is_mirrored_to_customer() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));

        fx.handler().handle(command(session())).await.unwrap();

        let user = UserId::new("user_1").unwrap();
        assert!(fx.addresses.find_default(&user).await.unwrap().is_some());
        assert!(fx.provider.was_called("update_customer_shipping"));
    }

    #[tokio::test]
    async fn unpaid_one_off_checkout_requests_payment_and_retires_link() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        let mut s = session();
        s.payment_status = "unpaid".to_string();
        s.payment_method_types = vec!["konbini".to_string()];
        s.payment_link_id = Some("plink_1".to_string());

        fx.handler().handle(command(s)).await.unwrap();

        let requests = fx.notifications.payment_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].payment_method, PaymentMethod::Konbini);
        assert_eq!(fx.provider.call_count("deactivate_payment_link"), 1);
        let snapshot = fx.orders.snapshot().await;
        assert_eq!(snapshot.orders[0].status, OrderStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn subscription_checkout_skips_payment_request_and_link() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_club", 800, monthly())]));
        let mut s = session();
        s.payment_status = "unpaid".to_string();
        s.subscription_id = Some("sub_1".to_string());
        s.payment_link_id = Some("plink_1".to_string());

        fx.handler().handle(command(s)).await.unwrap();

        assert!(fx.notifications.payment_requests().await.is_empty());
        assert!(!fx.provider.was_called("deactivate_payment_link"));
        let snapshot = fx.orders.snapshot().await;
        assert_eq!(snapshot.subscription_linkages[0].status, SubscriptionStatus::Incomplete);
    }

    // ═══════════════════════════════════════════════════════════════
    // Guards
    // ═══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn second_delivery_is_already_fulfilled() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        let handler = fx.handler();
        handler.handle(command(session())).await.unwrap();

        let again = handler.handle(command(session())).await.unwrap();

        assert!(matches!(again, CompleteCheckoutResult::AlreadyFulfilled { .. }));
        assert_eq!(fx.orders.snapshot().await.orders.len(), 1);
        assert_eq!(fx.notifications.confirmations().await.len(), 1);
        assert_eq!(fx.inventory.stock_of("prod_tea").await, Some(9));
    }

    #[tokio::test]
    async fn missing_user_or_email_is_invalid_event() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        let mut no_user = session();
        no_user.user_id = None;
        let mut no_email = session();
        no_email.customer_email = Some(" ".to_string());

        for s in [no_user, no_email] {
            let err = fx.handler().handle(command(s)).await.unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidEvent(_)), "{:?}", err);
        }
        assert!(!fx.provider.was_called("list_checkout_line_items"));
        assert!(fx.orders.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn session_without_line_items_fails_before_creating_anything() {
        let fx = Fixture::new(provider_with_items(vec![]));

        let err = fx.handler().handle(command(session())).await.unwrap_err();

        assert_eq!(err.step(), Some(SagaStep::ResolveLineItems));
        assert!(fx.orders.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn line_item_listing_failure_is_step_one_failure() {
        let provider = provider_with_items(vec![line_item("prod_tea", 1000, None)])
            .with_method_error("list_checkout_line_items", PaymentError::network("timeout"));
        let fx = Fixture::new(provider);

        let err = fx.handler().handle(command(session())).await.unwrap_err();

        assert_eq!(err.step(), Some(SagaStep::ResolveLineItems));
    }

    // ═══════════════════════════════════════════════════════════════
    // Compensation
    // ═══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_linkage_failure_unwinds_earlier_steps() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_club", 800, monthly())]));
        fx.orders.fail_on(OrderOperation::CreateSubscriptionLinkages).await;
        let mut s = session();
        s.subscription_id = Some("sub_1".to_string());

        let err = fx.handler().handle(command(s)).await.unwrap_err();

        match err {
            CheckoutError::StepFailed { step, unwound, .. } => {
                assert_eq!(step, SagaStep::CreateSubscriptionLinkages);
                assert_eq!(
                    unwound,
                    vec![
                        SagaStep::CreateLineItems,
                        SagaStep::CreatePaymentLinkage,
                        SagaStep::CreateOrder
                    ]
                );
            }
            other => panic!("Expected StepFailed, got {:?}", other),
        }
        assert!(fx.orders.snapshot().await.is_empty());
        assert_eq!(fx.inventory.stock_of("prod_club").await, Some(100));
        assert!(fx.notifications.confirmations().await.is_empty());
    }

    #[tokio::test]
    async fn failed_compensation_is_reported() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        fx.orders.fail_on(OrderOperation::CreateItemPaymentLinkages).await;
        fx.orders.fail_on(OrderOperation::DeleteLineItems).await;

        let err = fx.handler().handle(command(session())).await.unwrap_err();

        match err {
            CheckoutError::StepFailed { compensation_failures, .. } => {
                assert_eq!(compensation_failures.len(), 1);
                assert_eq!(compensation_failures[0].step, SagaStep::CreateLineItems);
            }
            other => panic!("Expected StepFailed, got {:?}", other),
        }
        let snapshot = fx.orders.snapshot().await;
        assert!(snapshot.orders.is_empty());
        assert_eq!(snapshot.line_items.len(), 1);
    }

    #[tokio::test]
    async fn payment_link_failure_keeps_order() {
        let provider = provider_with_items(vec![line_item("prod_tea", 1000, None)])
            .with_method_error("deactivate_payment_link", PaymentError::network("timeout"));
        let fx = Fixture::new(provider);
        let mut s = session();
        s.payment_link_id = Some("plink_1".to_string());

        let err = fx.handler().handle(command(s)).await.unwrap_err();

        assert_eq!(err.step(), Some(SagaStep::DeactivatePaymentLink));
        assert!(err.order_persisted());
        assert_eq!(fx.orders.snapshot().await.orders.len(), 1);
        assert_eq!(fx.notifications.confirmations().await.len(), 1);
    }

    #[tokio::test]
    async fn item_payment_linkage_failure_unwinds_whole_graph() {
        let fx = Fixture::new(provider_with_items(vec![
            line_item("prod_tea", 1000, None),
            line_item("prod_club", 800, monthly()),
        ]));
        fx.orders.fail_on(OrderOperation::CreateItemPaymentLinkages).await;
        let mut s = session();
        s.subscription_id = Some("sub_1".to_string());

        let err = fx.handler().handle(command(s)).await.unwrap_err();

        assert_eq!(err.step(), Some(SagaStep::CreateItemPaymentLinkages));
        assert!(fx.orders.snapshot().await.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════
    // Redelivery after the commit point
    // ═══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn redelivery_retires_link_that_failed_to_deactivate() {
        let failing = provider_with_items(vec![line_item("prod_tea", 1000, None)])
            .with_method_error("deactivate_payment_link", PaymentError::network("timeout"));
        let fx = Fixture::new(failing);
        let mut s = session();
        s.payment_link_id = Some("plink_1".to_string());
        fx.handler().handle(command(s.clone())).await.unwrap_err();

        let healthy = Arc::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        let result = fx
            .handler_with(healthy.clone())
            .handle(command(s))
            .await
            .unwrap();

        match result {
            CompleteCheckoutResult::Resumed { steps, .. } => {
                assert_eq!(steps, vec![SagaStep::DeactivatePaymentLink]);
            }
            other => panic!("Expected Resumed, got {:?}", other),
        }
        assert_eq!(healthy.call_count("deactivate_payment_link"), 1);
        assert!(!healthy.was_called("list_checkout_line_items"));
        assert_eq!(fx.orders.snapshot().await.orders.len(), 1);
        assert_eq!(fx.inventory.stock_of("prod_tea").await, Some(9));
        assert_eq!(fx.notifications.confirmations().await.len(), 1);
    }

    #[tokio::test]
    async fn redelivery_resends_failed_confirmation_once() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_tea", 1000, None)]));
        fx.notifications.fail_on(NotificationKind::OrderConfirmation).await;
        let err = fx.handler().handle(command(session())).await.unwrap_err();
        assert_eq!(err.step(), Some(SagaStep::SendOrderConfirmation));
        fx.notifications.recover(NotificationKind::OrderConfirmation).await;

        let resumed = fx.handler().handle(command(session())).await.unwrap();
        let again = fx.handler().handle(command(session())).await.unwrap();

        assert!(matches!(
            resumed,
            CompleteCheckoutResult::Resumed { ref steps, .. } if steps == &vec![SagaStep::SendOrderConfirmation]
        ));
        assert!(matches!(again, CompleteCheckoutResult::AlreadyFulfilled { .. }));
        let confirmations = fx.notifications.confirmations().await;
        assert_eq!(confirmations.len(), 1);
        assert_eq!(confirmations[0].products[0].title, "Sencha");
        assert_eq!(fx.inventory.stock_of("prod_tea").await, Some(9));
    }

    #[tokio::test]
    async fn redelivery_after_stock_failure_applies_stock_once() {
        let fx = Fixture::new(provider_with_items(vec![line_item("prod_new", 1000, None)]));
        let err = fx.handler().handle(command(session())).await.unwrap_err();
        assert_eq!(err.step(), Some(SagaStep::UpdateStock));
        assert!(fx.notifications.confirmations().await.is_empty());
        fx.inventory.add_product("prod_new", 5).await;

        let resumed = fx.handler().handle(command(session())).await.unwrap();
        let again = fx.handler().handle(command(session())).await.unwrap();

        match resumed {
            CompleteCheckoutResult::Resumed { steps, .. } => assert_eq!(
                steps,
                vec![
                    SagaStep::UpdateStock,
                    SagaStep::PersistShippingAddress,
                    SagaStep::SendOrderConfirmation
                ]
            ),
            other => panic!("Expected Resumed, got {:?}", other),
        }
        assert!(matches!(again, CompleteCheckoutResult::AlreadyFulfilled { .. }));
        assert_eq!(fx.inventory.stock_of("prod_new").await, Some(4));
        assert_eq!(fx.orders.snapshot().await.orders.len(), 1);
        assert_eq!(fx.notifications.confirmations().await.len(), 1);
    }
}
