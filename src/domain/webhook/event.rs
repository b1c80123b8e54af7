//! Stripe event envelope.
//!
//! Only the envelope is modelled here; the `data.object` payload is decoded
//! by the Stripe adapter according to the event type.

use serde::{Deserialize, Serialize};

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp of event creation.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Decodes `data.object` as the given type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Event types the storefront reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CustomerSubscriptionUpdated,
    /// Acknowledged and recorded as ignored.
    Other,
}

impl StripeEventType {
    pub const CHECKOUT_SESSION_COMPLETED: &'static str = "checkout.session.completed";
    pub const CUSTOMER_SUBSCRIPTION_UPDATED: &'static str = "customer.subscription.updated";

    pub fn parse(s: &str) -> Self {
        match s {
            Self::CHECKOUT_SESSION_COMPLETED => Self::CheckoutSessionCompleted,
            Self::CUSTOMER_SUBSCRIPTION_UPDATED => Self::CustomerSubscriptionUpdated,
            _ => Self::Other,
        }
    }
}
