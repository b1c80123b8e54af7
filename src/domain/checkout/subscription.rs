//! Subscription state as observed through provider lifecycle events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{SubscriptionPaymentId, Timestamp, UserId};

/// Provider-reported subscription status.
///
/// Only `Active` is treated as healthy; every other state triggers a
/// payment-request notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Paused,
    Unknown(String),
}

impl SubscriptionStatus {
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            "canceled" => SubscriptionStatus::Canceled,
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "trialing" => SubscriptionStatus::Trialing,
            "paused" => SubscriptionStatus::Paused,
            other => SubscriptionStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence unit of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(BillingInterval::Day),
            "week" => Some(BillingInterval::Week),
            "month" => Some(BillingInterval::Month),
            "year" => Some(BillingInterval::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "day",
            BillingInterval::Week => "week",
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

/// How often a recurring price bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recurrence {
    pub interval: BillingInterval,
    pub interval_count: u32,
}

impl Recurrence {
    /// Human-readable cadence stored in line item remarks, e.g. `every 3 months`.
    pub fn describe(&self) -> String {
        if self.interval_count <= 1 {
            format!("every {}", self.interval.as_str())
        } else {
            format!("every {} {}s", self.interval_count, self.interval.as_str())
        }
    }
}

/// One observed subscription lifecycle event.
///
/// Append-only; one row is written per delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    pub id: SubscriptionPaymentId,
    pub user_id: UserId,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub observed_at: Timestamp,
}

impl SubscriptionPayment {
    pub fn record(
        user_id: UserId,
        subscription_id: impl Into<String>,
        status: SubscriptionStatus,
        observed_at: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionPaymentId::new(),
            user_id,
            subscription_id: subscription_id.into(),
            status,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_is_active() {
        let statuses = [
            "active",
            "past_due",
            "unpaid",
            "canceled",
            "incomplete",
            "incomplete_expired",
            "trialing",
            "paused",
            "something_new",
        ];
        let active: Vec<_> = statuses
            .iter()
            .filter(|s| SubscriptionStatus::from_provider(s).is_active())
            .collect();
        assert_eq!(active, vec![&"active"]);
    }

    #[test]
    fn status_mapping_preserves_provider_string() {
        for s in ["past_due", "incomplete_expired", "something_new"] {
            assert_eq!(SubscriptionStatus::from_provider(s).as_str(), s);
        }
    }

    #[test]
    fn unknown_status_is_kept() {
        assert_eq!(
            SubscriptionStatus::from_provider("frozen"),
            SubscriptionStatus::Unknown("frozen".to_string())
        );
    }

    #[test]
    fn billing_interval_parses_provider_values() {
        assert_eq!(BillingInterval::parse("month"), Some(BillingInterval::Month));
        assert_eq!(BillingInterval::parse("fortnight"), None);
    }

    #[test]
    fn recurrence_describes_single_and_multiple_intervals() {
        let monthly = Recurrence { interval: BillingInterval::Month, interval_count: 1 };
        let quarterly = Recurrence { interval: BillingInterval::Month, interval_count: 3 };
        assert_eq!(monthly.describe(), "every month");
        assert_eq!(quarterly.describe(), "every 3 months");
    }
}
