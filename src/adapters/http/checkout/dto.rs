//! HTTP DTOs for the webhook endpoint.
//!
//! The payment provider reads only the status code; the bodies exist for
//! operators inspecting delivery logs in the provider dashboard.

use serde::Serialize;

/// Acknowledgement returned with `200 OK`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookAckResponse {
    pub success: bool,
}

impl WebhookAckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Error body returned with `4xx`/`5xx`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Liveness check body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
