//! Delivery addresses captured at checkout.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ShippingAddressId, Timestamp, UserId};

/// Postal address as collected by the hosted checkout page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Recipient and address captured on a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub phone: Option<String>,
    pub address: PostalAddress,
}

/// A user's stored delivery address.
///
/// At most one address per user has `is_default` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: ShippingAddressId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: Option<String>,
    pub address: PostalAddress,
    pub is_default: bool,
    pub created_at: Timestamp,
}

impl ShippingAddress {
    /// Builds the user's default address from checkout details.
    pub fn default_from(user_id: UserId, details: &ShippingDetails, now: Timestamp) -> Self {
        Self {
            id: ShippingAddressId::new(),
            user_id,
            recipient_name: details.name.clone(),
            phone: details.phone.clone(),
            address: details.address.clone(),
            is_default: true,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_from_copies_details_and_marks_default() {
        let details = ShippingDetails {
            name: "Aiko Tanaka".to_string(),
            phone: Some("+81-3-0000-0000".to_string()),
            address: PostalAddress {
                line1: Some("1-2-3 Shibuya".to_string()),
                city: Some("Tokyo".to_string()),
                country: Some("JP".to_string()),
                ..Default::default()
            },
        };
        let user = UserId::new("user_1").unwrap();

        let address = ShippingAddress::default_from(user.clone(), &details, Timestamp::now());

        assert!(address.is_default);
        assert_eq!(address.user_id, user);
        assert_eq!(address.recipient_name, "Aiko Tanaka");
        assert_eq!(address.address, details.address);
    }
}
