//! Line items belonging to an order.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LineItemId, OrderId, ProductId, ValidationError};

/// One purchased product within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: i64,
    pub quantity: u32,
    /// Always `unit_price * quantity`.
    pub amount: i64,
    /// Billing cadence for recurring items, empty otherwise.
    pub remarks: String,
}

impl LineItem {
    /// Creates a line item, computing its amount.
    ///
    /// # Errors
    ///
    /// Returns `BelowMinimum` if quantity is zero or the unit price is negative,
    /// and `Overflow` if the amount does not fit in an `i64`.
    pub fn new(
        order_id: OrderId,
        product_id: ProductId,
        unit_price: i64,
        quantity: u32,
        remarks: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::below_minimum("quantity", 1, 0));
        }
        if unit_price < 0 {
            return Err(ValidationError::below_minimum("unit_price", 0, unit_price));
        }
        let amount = unit_price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| ValidationError::overflow("amount"))?;
        Ok(Self {
            id: LineItemId::new(),
            order_id,
            product_id,
            unit_price,
            quantity,
            amount,
            remarks: remarks.into(),
        })
    }
}

/// Stock decrement and sold-count increment for one product.
///
/// Applied once the whole order graph exists and never reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl From<&LineItem> for StockAdjustment {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ProductId {
        ProductId::new("prod_tea").unwrap()
    }

    #[test]
    fn amount_is_unit_price_times_quantity() {
        let item = LineItem::new(OrderId::new(), product(), 1200, 3, "").unwrap();
        assert_eq!(item.amount, 3600);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = LineItem::new(OrderId::new(), product(), 1200, 0, "").unwrap_err();
        assert_eq!(err, ValidationError::below_minimum("quantity", 1, 0));
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(LineItem::new(OrderId::new(), product(), -1, 1, "").is_err());
    }

    #[test]
    fn amount_overflow_is_rejected() {
        let err = LineItem::new(OrderId::new(), product(), i64::MAX / 2, 3, "").unwrap_err();
        assert_eq!(err, ValidationError::overflow("amount"));
    }

    #[test]
    fn free_items_are_allowed() {
        let item = LineItem::new(OrderId::new(), product(), 0, 2, "").unwrap();
        assert_eq!(item.amount, 0);
    }

    #[test]
    fn stock_adjustment_mirrors_line_item() {
        let item = LineItem::new(OrderId::new(), product(), 500, 4, "").unwrap();
        let adjustment = StockAdjustment::from(&item);
        assert_eq!(adjustment.product_id, item.product_id);
        assert_eq!(adjustment.quantity, 4);
    }
}
