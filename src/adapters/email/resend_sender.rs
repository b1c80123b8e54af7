//! Resend email adapter.
//!
//! Renders the transactional messages as plain text and posts them to the
//! Resend `/emails` endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::checkout::{PaymentMethod, ProductDetail};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{
    NotificationSender, OrderConfirmation, PaymentRequest, SubscriptionPaymentRequest,
};

/// Currencies whose minor unit is the major unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["jpy", "krw", "vnd", "clp", "isk", "ugx", "xaf", "xof"];

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    /// Formatted `Name <address>` sender.
    from: String,
    api_base_url: String,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            api_base_url: "https://api.resend.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
}

/// Sends transactional email through Resend.
pub struct ResendNotificationSender {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendNotificationSender {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn send(&self, to: &str, subject: String, text: String) -> Result<(), DomainError> {
        let url = format!("{}/emails", self.config.api_base_url);
        let body = SendEmailRequest {
            from: &self.config.from,
            to: vec![to],
            subject,
            text,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::NotificationError, format!("Email request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status, error = %error_text, "Resend send failed");
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Resend API error ({}): {}", status, error_text),
            ));
        }

        tracing::debug!(subject = %body.subject, "Email sent");
        Ok(())
    }
}

/// Formats minor units for display, e.g. `1,500 JPY` or `12.50 USD`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let code = currency.to_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str()) {
        return format!("{} {}", group_thousands(amount), code);
    }
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!(
        "{}{}.{:02} {}",
        sign,
        group_thousands((abs / 100) as i64),
        abs % 100,
        code
    )
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// One line per product. Amounts are omitted when the currency is unknown.
fn product_lines(products: &[ProductDetail], currency: Option<&str>) -> String {
    products
        .iter()
        .map(|p| {
            let cadence = p
                .recurring
                .map(|r| format!(" ({})", r.describe()))
                .unwrap_or_default();
            match currency {
                Some(currency) => format!(
                    "- {} x{}: {}{}",
                    p.title,
                    p.quantity,
                    format_amount(p.amount_total, currency),
                    cadence
                ),
                None => format!("- {} x{}{}", p.title, p.quantity, cadence),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn payment_instructions(method: &PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Konbini => {
            "Please pay at a convenience store using the instructions sent by our payment provider."
        }
        PaymentMethod::BankTransfer => {
            "Please complete the bank transfer using the account details sent by our payment provider."
        }
        _ => "Please complete your payment using the instructions sent by our payment provider.",
    }
}

fn render_order_confirmation(message: &OrderConfirmation) -> (String, String) {
    let greeting = message.customer_name.as_deref().unwrap_or("customer");
    let mut text = format!(
        "Dear {},\n\nThank you for your order {}.\n\nStatus: {}\nPayment method: {}\n\n{}\n\nShipping: {}\nTotal: {}\n",
        greeting,
        message.order_number,
        message.status.as_str(),
        message.payment_method.as_str(),
        product_lines(&message.products, Some(&message.currency)),
        format_amount(message.shipping_fee, &message.currency),
        format_amount(message.total_amount, &message.currency),
    );
    if let Some(shipping) = &message.shipping {
        let address = &shipping.address;
        let parts: Vec<&str> = [
            &address.postal_code,
            &address.state,
            &address.city,
            &address.line1,
            &address.line2,
            &address.country,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
        text.push_str(&format!("\nShip to: {}, {}\n", shipping.name, parts.join(" ")));
    }
    (format!("Order confirmation {}", message.order_number), text)
}

fn render_payment_request(message: &PaymentRequest) -> (String, String) {
    let greeting = message.customer_name.as_deref().unwrap_or("customer");
    let text = format!(
        "Dear {},\n\nWe have received order {}. Amount due: {}.\n\n{}\n",
        greeting,
        message.order_number,
        format_amount(message.amount, &message.currency),
        payment_instructions(&message.payment_method),
    );
    (format!("Payment request for order {}", message.order_number), text)
}

fn render_subscription_request(message: &SubscriptionPaymentRequest) -> (String, String) {
    let text = format!(
        "Hello,\n\nYour subscription {} is currently {}. Please update your payment details to keep it running.\n\n{}\n",
        message.subscription_id,
        message.status,
        product_lines(&message.products, None),
    );
    ("Action needed for your subscription".to_string(), text)
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), DomainError> {
        let (subject, text) = render_order_confirmation(message);
        self.send(&message.customer_email, subject, text).await
    }

    async fn send_payment_request(&self, message: &PaymentRequest) -> Result<(), DomainError> {
        let (subject, text) = render_payment_request(message);
        self.send(&message.customer_email, subject, text).await
    }

    async fn send_subscription_payment_request(
        &self,
        message: &SubscriptionPaymentRequest,
    ) -> Result<(), DomainError> {
        let (subject, text) = render_subscription_request(message);
        self.send(&message.customer_email, subject, text).await
    }
}
