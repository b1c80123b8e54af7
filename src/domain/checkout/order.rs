//! Order aggregate root for a completed checkout.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{OrderId, Timestamp, UserId};

/// Whether the provider has confirmed the funds for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Funds captured, or nothing to pay.
    Paid,
    /// Deferred methods (bank transfer, konbini) that settle later.
    AwaitingPayment,
}

impl OrderStatus {
    /// Maps the checkout session `payment_status` field.
    pub fn from_payment_status(payment_status: &str) -> Self {
        match payment_status {
            "paid" | "no_payment_required" => OrderStatus::Paid,
            _ => OrderStatus::AwaitingPayment,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "paid",
            OrderStatus::AwaitingPayment => "awaiting_payment",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(OrderStatus::Paid),
            "awaiting_payment" => Some(OrderStatus::AwaitingPayment),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid, taken from the session's first payment method type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Konbini,
    Other(String),
}

impl PaymentMethod {
    /// Maps a provider payment method type such as `card` or `customer_balance`.
    pub fn from_provider(method_type: &str) -> Self {
        match method_type {
            "card" => PaymentMethod::Card,
            "customer_balance" => PaymentMethod::BankTransfer,
            "konbini" => PaymentMethod::Konbini,
            other => PaymentMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Konbini => "konbini",
            PaymentMethod::Other(s) => s.as_str(),
        }
    }

    /// Parses the stored representation. Unknown values are kept verbatim.
    pub fn parse(s: &str) -> Self {
        match s {
            "card" => PaymentMethod::Card,
            "bank_transfer" => PaymentMethod::BankTransfer,
            "konbini" => PaymentMethod::Konbini,
            other => PaymentMethod::Other(other.to_string()),
        }
    }
}

/// A purchase created from a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Provider-authoritative session total, minor units.
    pub total_amount: i64,
    pub shipping_fee: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub created_at: Timestamp,
}

impl Order {
    /// Creates a new order with a fresh id and derived order number.
    pub fn new(
        user_id: UserId,
        status: OrderStatus,
        total_amount: i64,
        shipping_fee: i64,
        currency: impl Into<String>,
        payment_method: PaymentMethod,
        created_at: Timestamp,
    ) -> Self {
        let id = OrderId::new();
        Self {
            order_number: order_number(&id, &created_at),
            id,
            user_id,
            status,
            total_amount,
            shipping_fee,
            currency: currency.into(),
            payment_method,
            created_at,
        }
    }
}

/// Builds the customer-facing order number: `YYYYMMDD-XXXXXXXX`.
pub fn order_number(id: &OrderId, created_at: &Timestamp) -> String {
    let simple = id.as_uuid().simple().to_string();
    format!("{}-{}", created_at.compact_date(), simple[..8].to_uppercase())
}
