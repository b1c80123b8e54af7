//! Stripe API objects as they arrive over the wire.
//!
//! These types parse actual Stripe JSON (webhook payloads and REST
//! responses) and map onto the provider-neutral port types. Fields the
//! storefront does not read are left out; serde ignores them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::checkout::{
    BillingInterval, PostalAddress, Recurrence, ShippingDetails, SubscriptionStatus,
};
use crate::domain::webhook::{StripeEvent, StripeEventType, WebhookError};
use crate::ports::{
    CheckoutSession, ProviderLineItem, ProviderProduct, ProviderSubscription, WebhookEvent,
    WebhookEventType, WebhookPayload,
};

/// Metadata key carrying the storefront user on sessions and subscriptions.
pub const USER_ID_METADATA_KEY: &str = "user_id";

// ════════════════════════════════════════════════════════════════════════════════
// Event decoding
// ════════════════════════════════════════════════════════════════════════════════

/// Decodes a verified event envelope into the port representation.
///
/// Event types the storefront does not handle decode to
/// [`WebhookPayload::Unrecognized`] without inspecting the object.
pub fn decode_event(event: StripeEvent) -> Result<WebhookEvent, WebhookError> {
    let raw = serde_json::to_value(&event).map_err(|e| WebhookError::ParseError(e.to_string()))?;

    let (event_type, payload) = match event.parsed_type() {
        StripeEventType::CheckoutSessionCompleted => {
            let session: StripeCheckoutSession = event
                .deserialize_object()
                .map_err(|e| WebhookError::ParseError(format!("checkout session: {}", e)))?;
            (
                WebhookEventType::CheckoutSessionCompleted,
                WebhookPayload::CheckoutSession(session.into_session()),
            )
        }
        StripeEventType::CustomerSubscriptionUpdated => {
            let subscription: StripeSubscription = event
                .deserialize_object()
                .map_err(|e| WebhookError::ParseError(format!("subscription: {}", e)))?;
            (
                WebhookEventType::SubscriptionUpdated,
                WebhookPayload::Subscription(subscription.into_subscription()),
            )
        }
        StripeEventType::Other => (
            WebhookEventType::Unknown(event.event_type.clone()),
            WebhookPayload::Unrecognized,
        ),
    };

    Ok(WebhookEvent {
        id: event.id,
        event_type,
        created_at: event.created,
        livemode: event.livemode,
        payload,
        raw,
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Paginated list wrapper used by every Stripe list endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Payment mode (payment, setup, subscription).
    #[serde(default)]
    pub mode: String,

    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,

    /// Subscription ID if checkout created a subscription.
    pub subscription: Option<String>,
    pub payment_intent: Option<String>,
    pub payment_link: Option<String>,
    pub client_reference_id: Option<String>,

    pub amount_total: Option<i64>,
    pub currency: Option<String>,

    /// paid, unpaid or no_payment_required.
    pub payment_status: String,

    #[serde(default)]
    pub payment_method_types: Vec<String>,

    pub shipping_cost: Option<StripeShippingCost>,

    #[serde(alias = "shipping")]
    pub shipping_details: Option<StripeShipping>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    pub fn into_session(self) -> CheckoutSession {
        let details = self.customer_details.unwrap_or_default();
        let user_id = self
            .metadata
            .get(USER_ID_METADATA_KEY)
            .cloned()
            .or(self.client_reference_id)
            .filter(|id| !id.trim().is_empty());
        let shipping = self
            .shipping_details
            .and_then(|s| s.into_details(details.phone.clone()))
            .or_else(|| details.billing_shipping());

        CheckoutSession {
            id: self.id,
            mode: self.mode,
            payment_intent_id: self.payment_intent,
            subscription_id: self.subscription,
            customer_id: self.customer,
            payment_link_id: self.payment_link,
            amount_total: self.amount_total.unwrap_or(0),
            shipping_amount: self.shipping_cost.map(|c| c.amount_total).unwrap_or(0),
            currency: self.currency.unwrap_or_default(),
            payment_status: self.payment_status,
            payment_method_types: self.payment_method_types,
            customer_email: details.email.or(self.customer_email),
            customer_name: details.name,
            shipping,
            user_id,
        }
    }
}

/// Contact details the customer entered on the checkout page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Billing address; the only address when shipping collection is off.
    pub address: Option<StripeAddress>,
}

impl StripeCustomerDetails {
    /// Shipping details built from the billing contact.
    fn billing_shipping(&self) -> Option<ShippingDetails> {
        StripeShipping {
            name: self.name.clone(),
            phone: None,
            address: self.address.clone()?,
        }
        .into_details(self.phone.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeShippingCost {
    #[serde(default)]
    pub amount_total: i64,
}

/// Shipping block of a session, also used when writing to a customer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeShipping {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: StripeAddress,
}

impl StripeShipping {
    /// `None` when the recipient name is missing; Stripe sends a null
    /// block when shipping collection is off, but be strict anyway.
    fn into_details(self, fallback_phone: Option<String>) -> Option<ShippingDetails> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        Some(ShippingDetails {
            name,
            phone: self.phone.or(fallback_phone),
            address: self.address.into(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl From<StripeAddress> for PostalAddress {
    fn from(a: StripeAddress) -> Self {
        PostalAddress {
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            state: a.state,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

/// Checkout session line item (`/v1/checkout/sessions/{id}/line_items`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeLineItem {
    pub id: String,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount_total: i64,
    pub price: StripePrice,
}

impl StripeLineItem {
    pub fn into_line_item(self) -> ProviderLineItem {
        let quantity = self.quantity.unwrap_or(1);
        ProviderLineItem {
            id: self.id,
            price_id: self.price.id,
            product_id: self.price.product,
            description: self.description,
            unit_amount: self.price.unit_amount.unwrap_or(0),
            quantity,
            amount_total: self.amount_total,
            recurring: self.price.recurring.and_then(StripePriceRecurring::into_recurrence),
        }
    }
}

/// Stripe Price object (embedded in line items and subscription items).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    pub id: String,

    /// Product ID this price is for.
    pub product: String,

    /// Unit amount in minor units.
    pub unit_amount: Option<i64>,

    pub recurring: Option<StripePriceRecurring>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePriceRecurring {
    /// day, week, month or year.
    pub interval: String,

    #[serde(default = "default_quantity")]
    pub interval_count: u32,
}

impl StripePriceRecurring {
    fn into_recurrence(self) -> Option<Recurrence> {
        let interval = match BillingInterval::parse(&self.interval) {
            Some(interval) => interval,
            None => {
                tracing::warn!(interval = %self.interval, "unknown billing interval, treating price as one-off");
                return None;
            }
        };
        Some(Recurrence {
            interval,
            interval_count: self.interval_count.max(1),
        })
    }
}

fn default_quantity() -> u32 {
    1
}

/// Stripe Product object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeProduct {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Present (and true) when the product was deleted.
    #[serde(default)]
    pub deleted: bool,
}

impl From<StripeProduct> for ProviderProduct {
    fn from(p: StripeProduct) -> Self {
        ProviderProduct {
            id: p.id,
            name: p.name,
            images: p.images,
        }
    }
}

/// Subscription customer: an id, or the customer object when expanded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StripeCustomerRef {
    Id(String),
    Object(StripeCustomer),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    pub customer: StripeCustomerRef,

    pub status: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

impl StripeSubscription {
    pub fn into_subscription(self) -> ProviderSubscription {
        let (customer_id, customer_email) = match self.customer {
            StripeCustomerRef::Id(id) => (id, None),
            StripeCustomerRef::Object(c) => (c.id, c.email),
        };
        ProviderSubscription {
            id: self.id,
            customer_id,
            customer_email,
            status: SubscriptionStatus::from_provider(&self.status),
            items: self
                .items
                .data
                .into_iter()
                .map(StripeSubscriptionItem::into_line_item)
                .collect(),
            user_id: self
                .metadata
                .get(USER_ID_METADATA_KEY)
                .cloned()
                .filter(|id| !id.trim().is_empty()),
        }
    }
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl StripeSubscriptionItem {
    fn into_line_item(self) -> ProviderLineItem {
        let unit_amount = self.price.unit_amount.unwrap_or(0);
        ProviderLineItem {
            id: self.id,
            price_id: self.price.id,
            product_id: self.price.product,
            description: None,
            unit_amount,
            quantity: self.quantity,
            amount_total: unit_amount * i64::from(self.quantity),
            recurring: self.price.recurring.and_then(StripePriceRecurring::into_recurrence),
        }
    }
}

/// Error body returned by the Stripe REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}
