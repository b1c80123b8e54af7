//! Ordered step runner with compensations.
//!
//! Each successful step registers a compensation built from its output.
//! When a later step fails, registered compensations run newest first and
//! the failure is returned as [`CheckoutError::StepFailed`]. Calling
//! [`Saga::commit`] drops every compensation; nothing done before that
//! point is unwound afterwards.
//!
//! ```ignore
//! let mut saga = Saga::new("checkout");
//! let order = saga
//!     .execute(SagaStep::CreateOrder, repo.create_order(&order), |order| {
//!         let repo = repo.clone();
//!         let id = order.id;
//!         Box::pin(async move { repo.delete_order(&id).await })
//!     })
//!     .await?;
//! saga.commit();
//! ```

use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::future::Future;

use crate::domain::foundation::DomainError;

use super::errors::{CheckoutError, CompensationFailure};

/// Deferred undo action for a completed step.
pub type Compensation = BoxFuture<'static, Result<(), DomainError>>;

/// Named steps of the checkout and subscription flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    ResolveLineItems,
    CreateOrder,
    CreatePaymentLinkage,
    CreateLineItems,
    CreateSubscriptionLinkages,
    CreateItemPaymentLinkages,
    UpdateStock,
    PersistShippingAddress,
    SendOrderConfirmation,
    SendPaymentRequest,
    DeactivatePaymentLink,
    RecordSubscriptionPayment,
    FetchSubscription,
    SendSubscriptionPaymentRequest,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::ResolveLineItems => "resolve_line_items",
            SagaStep::CreateOrder => "create_order",
            SagaStep::CreatePaymentLinkage => "create_payment_linkage",
            SagaStep::CreateLineItems => "create_line_items",
            SagaStep::CreateSubscriptionLinkages => "create_subscription_linkages",
            SagaStep::CreateItemPaymentLinkages => "create_item_payment_linkages",
            SagaStep::UpdateStock => "update_stock",
            SagaStep::PersistShippingAddress => "persist_shipping_address",
            SagaStep::SendOrderConfirmation => "send_order_confirmation",
            SagaStep::SendPaymentRequest => "send_payment_request",
            SagaStep::DeactivatePaymentLink => "deactivate_payment_link",
            SagaStep::RecordSubscriptionPayment => "record_subscription_payment",
            SagaStep::FetchSubscription => "fetch_subscription",
            SagaStep::SendSubscriptionPaymentRequest => "send_subscription_payment_request",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let step = match s {
            "resolve_line_items" => SagaStep::ResolveLineItems,
            "create_order" => SagaStep::CreateOrder,
            "create_payment_linkage" => SagaStep::CreatePaymentLinkage,
            "create_line_items" => SagaStep::CreateLineItems,
            "create_subscription_linkages" => SagaStep::CreateSubscriptionLinkages,
            "create_item_payment_linkages" => SagaStep::CreateItemPaymentLinkages,
            "update_stock" => SagaStep::UpdateStock,
            "persist_shipping_address" => SagaStep::PersistShippingAddress,
            "send_order_confirmation" => SagaStep::SendOrderConfirmation,
            "send_payment_request" => SagaStep::SendPaymentRequest,
            "deactivate_payment_link" => SagaStep::DeactivatePaymentLink,
            "record_subscription_payment" => SagaStep::RecordSubscriptionPayment,
            "fetch_subscription" => SagaStep::FetchSubscription,
            "send_subscription_payment_request" => SagaStep::SendSubscriptionPaymentRequest,
            _ => return None,
        };
        Some(step)
    }
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs steps in order and unwinds on the first failure.
pub struct Saga {
    name: &'static str,
    completed: Vec<(SagaStep, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Vec::new(),
        }
    }

    /// Number of registered compensations.
    pub fn pending_compensations(&self) -> usize {
        self.completed.len()
    }

    /// Runs `action`. On success registers `compensate(&output)` and returns
    /// the output; on failure unwinds everything registered so far.
    pub async fn execute<T, E, A, C>(
        &mut self,
        step: SagaStep,
        action: A,
        compensate: C,
    ) -> Result<T, CheckoutError>
    where
        A: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: FnOnce(&T) -> Compensation,
    {
        match action.await {
            Ok(output) => {
                let compensation = compensate(&output);
                self.completed.push((step, compensation));
                tracing::info!(saga = self.name, %step, "saga step completed");
                Ok(output)
            }
            Err(err) => Err(self.fail(step, err.to_string()).await),
        }
    }

    /// Runs a step that has nothing to undo, such as a read.
    pub async fn run<T, E, A>(&mut self, step: SagaStep, action: A) -> Result<T, CheckoutError>
    where
        A: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match action.await {
            Ok(output) => {
                tracing::debug!(saga = self.name, %step, "saga step completed");
                Ok(output)
            }
            Err(err) => Err(self.fail(step, err.to_string()).await),
        }
    }

    /// Fails the saga at `step` with a message produced by the caller,
    /// unwinding completed steps.
    pub async fn abort(&mut self, step: SagaStep, message: impl Into<String>) -> CheckoutError {
        self.fail(step, message.into()).await
    }

    /// Passes the commit point. Registered compensations are discarded.
    pub fn commit(self) {
        tracing::info!(
            saga = self.name,
            steps = self.completed.len(),
            "saga committed"
        );
    }

    async fn fail(&mut self, step: SagaStep, message: String) -> CheckoutError {
        tracing::error!(saga = self.name, %step, error = %message, "saga step failed, unwinding");

        let mut unwound = Vec::with_capacity(self.completed.len());
        let mut compensation_failures = Vec::new();

        while let Some((done, compensation)) = self.completed.pop() {
            match compensation.await {
                Ok(()) => {
                    tracing::info!(saga = self.name, step = %done, "compensation applied");
                }
                Err(err) => {
                    tracing::error!(
                        saga = self.name,
                        step = %done,
                        error = %err,
                        "compensation failed, manual cleanup required"
                    );
                    compensation_failures.push(CompensationFailure {
                        step: done,
                        message: err.to_string(),
                    });
                }
            }
            unwound.push(done);
        }

        CheckoutError::StepFailed {
            step,
            message,
            unwound,
            compensation_failures,
        }
    }
}
