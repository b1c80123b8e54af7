//! WebhookEventRepository port - ledger of handled webhook deliveries.
//!
//! The provider redelivers an event whenever we answer with a 5xx or time
//! out, and occasionally even after a 2xx. The ledger lets the webhook
//! handler acknowledge an event it already finished without running the
//! checkout flow again.
//!
//! Only `Success` and `Ignored` outcomes are terminal. A `Failed` record
//! documents the last attempt and is replaced when a redelivery is handled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// How a delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookOutcome {
    Success,
    Ignored,
    Failed,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Success => "success",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(WebhookOutcome::Success),
            "ignored" => Some(WebhookOutcome::Ignored),
            "failed" => Some(WebhookOutcome::Failed),
            _ => None,
        }
    }

    /// Terminal outcomes block reprocessing of the same event.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WebhookOutcome::Failed)
    }
}

/// Record of a handled webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Provider event ID (evt_xxx format).
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
    pub outcome: WebhookOutcome,
    /// Ignore reason or failure message.
    pub detail: Option<String>,
    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(event_id, event_type, WebhookOutcome::Success, None, payload)
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            event_id,
            event_type,
            WebhookOutcome::Ignored,
            Some(reason.into()),
            payload,
        )
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            event_id,
            event_type,
            WebhookOutcome::Failed,
            Some(error.into()),
            payload,
        )
    }

    fn build(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: WebhookOutcome,
        detail: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            outcome,
            detail,
            payload,
        }
    }
}

/// Result of attempting to save a webhook event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Stored, either fresh or replacing a failed attempt.
    Inserted,
    /// A terminal record for the event already exists; nothing was written.
    AlreadyExists,
}

/// Port for storing and retrieving handled webhook events.
///
/// Implementations key records by event id and must not overwrite a
/// terminal record, even when two deliveries race.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Deletes records processed before `timestamp`, returning how many.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_record_has_no_detail() {
        let record = WebhookEventRecord::success(
            "evt_123",
            "checkout.session.completed",
            serde_json::json!({"id": "evt_123"}),
        );

        assert_eq!(record.event_id, "evt_123");
        assert_eq!(record.outcome, WebhookOutcome::Success);
        assert!(record.detail.is_none());
    }

    #[test]
    fn ignored_and_failed_records_carry_detail() {
        let ignored =
            WebhookEventRecord::ignored("evt_1", "invoice.paid", "unhandled", serde_json::json!({}));
        let failed =
            WebhookEventRecord::failed("evt_2", "checkout.session.completed", "db down", serde_json::json!({}));

        assert_eq!(ignored.detail.as_deref(), Some("unhandled"));
        assert_eq!(failed.detail.as_deref(), Some("db down"));
    }

    #[test]
    fn only_failed_is_not_terminal() {
        assert!(WebhookOutcome::Success.is_terminal());
        assert!(WebhookOutcome::Ignored.is_terminal());
        assert!(!WebhookOutcome::Failed.is_terminal());
    }

    #[test]
    fn outcome_round_trips_through_storage_string() {
        for outcome in [WebhookOutcome::Success, WebhookOutcome::Ignored, WebhookOutcome::Failed] {
            assert_eq!(WebhookOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(WebhookOutcome::parse("pending"), None);
    }

    #[test]
    fn webhook_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn WebhookEventRepository) {}
    }
}
