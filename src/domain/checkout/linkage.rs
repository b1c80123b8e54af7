//! Records binding internal order entities to payment provider identifiers.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LineItemId, OrderId, Timestamp};

use super::subscription::{BillingInterval, SubscriptionStatus};

/// Binds an order to the checkout session and payment intent that paid for it.
///
/// One per order. The session id is unique across all linkages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkage {
    pub order_id: OrderId,
    pub checkout_session_id: String,
    pub payment_intent_id: Option<String>,
    pub created_at: Timestamp,
}

/// Marks a line item as recurring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLinkage {
    pub line_item_id: LineItemId,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub interval: BillingInterval,
    pub interval_count: u32,
}

/// Per line item binding to the provider's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPaymentLinkage {
    pub line_item_id: LineItemId,
    pub price_id: String,
}
