//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Stripe REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Reject events whose `livemode` flag is false
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.require_livemode && self.is_test_mode() {
            return Err(ValidationError::TestKeyInLiveMode);
        }
        if !is_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidApiUrl("PAYMENT__API_BASE_URL"));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            require_livemode: false,
        }
    }
}

pub(super) fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_test_mode() {
        assert!(valid().is_test_mode());

        let live = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..valid()
        };
        assert!(!live.is_test_mode());
    }

    #[test]
    fn test_validation_missing_values() {
        assert!(PaymentConfig::default().validate().is_err());

        let no_secret = PaymentConfig {
            stripe_webhook_secret: String::new(),
            ..valid()
        };
        assert_eq!(
            no_secret.validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn test_validation_key_prefixes() {
        let publishable = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            ..valid()
        };
        assert_eq!(publishable.validate(), Err(ValidationError::InvalidStripeKey));

        let bad_secret = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid()
        };
        assert_eq!(
            bad_secret.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_livemode_requires_live_key() {
        let config = PaymentConfig {
            require_livemode: true,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::TestKeyInLiveMode));
    }

    #[test]
    fn test_base_url_must_be_http() {
        let config = PaymentConfig {
            api_base_url: "ftp://api.stripe.com".to_string(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApiUrl(_))));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid().validate().is_ok());
    }
}
