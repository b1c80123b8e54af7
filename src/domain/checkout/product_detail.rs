//! Display-ready product information shared by notifications.

use serde::{Deserialize, Serialize};

use super::subscription::Recurrence;

/// One purchased product, resolved against the catalog.
///
/// Built from provider line items; `title` falls back to a placeholder when
/// the product cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product_id: String,
    pub price_id: String,
    pub title: String,
    pub image: Option<String>,
    pub unit_amount: i64,
    pub quantity: u32,
    pub amount_total: i64,
    pub recurring: Option<Recurrence>,
    /// Set for recurring items bought under a subscription.
    pub subscription_id: Option<String>,
}

impl ProductDetail {
    pub fn is_recurring(&self) -> bool {
        self.recurring.is_some()
    }
}
