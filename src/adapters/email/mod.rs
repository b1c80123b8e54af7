//! Email adapters - `NotificationSender` implementations.

mod resend_sender;

pub use resend_sender::{format_amount, ResendConfig, ResendNotificationSender};
