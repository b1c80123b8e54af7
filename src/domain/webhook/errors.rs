//! Webhook error types.
//!
//! Every failure the webhook endpoint can report. All of them answer 500 so
//! the payment provider redelivers; a forged or stale delivery simply fails
//! verification again.

use http::StatusCode;
use thiserror::Error;

use crate::domain::checkout::CheckoutError;

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// The request carried no signature header.
    #[error("Missing signature header")]
    MissingSignature,

    /// No signature in the header matched the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Header or payload could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Test-mode event delivered to a live-mode deployment.
    #[error("Test mode event rejected")]
    TestModeRejected,

    /// Required metadata key absent from the event object.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// The checkout or subscription flow failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// A call to the payment provider failed outside the flows.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// The webhook ledger could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns true if a redelivery of the same event can succeed.
    pub fn is_retryable(&self) -> bool {
        !self.is_verification_failure()
    }

    /// Returns true for failures detected before any processing started.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
                | WebhookError::ParseError(_)
                | WebhookError::TestModeRejected
        )
    }

    /// HTTP status returned to the provider. Any failure is a 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
