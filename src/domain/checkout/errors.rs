//! Checkout saga outcomes.

use thiserror::Error;

use super::saga::SagaStep;

/// A compensation that itself failed while unwinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub step: SagaStep,
    pub message: String,
}

/// Errors produced by the checkout and subscription handlers.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// Upstream data error detected before anything was created.
    #[error("Invalid checkout event: {0}")]
    InvalidEvent(String),

    /// A step before the commit point failed. Completed steps were unwound.
    #[error("Checkout step '{step}' failed: {message}")]
    StepFailed {
        step: SagaStep,
        message: String,
        /// Steps whose compensation ran, most recent first.
        unwound: Vec<SagaStep>,
        compensation_failures: Vec<CompensationFailure>,
    },

    /// A step after the commit point failed. The order graph stands.
    #[error("Checkout step '{step}' failed after commit: {message}")]
    CommitPointFailed { step: SagaStep, message: String },
}

impl CheckoutError {
    /// Creates a step failure for a step that had nothing to unwind.
    pub fn step_failed(step: SagaStep, message: impl Into<String>) -> Self {
        CheckoutError::StepFailed {
            step,
            message: message.into(),
            unwound: Vec::new(),
            compensation_failures: Vec::new(),
        }
    }

    pub fn commit_point_failed(step: SagaStep, message: impl Into<String>) -> Self {
        CheckoutError::CommitPointFailed {
            step,
            message: message.into(),
        }
    }

    /// Returns the step that failed, if any.
    pub fn step(&self) -> Option<SagaStep> {
        match self {
            CheckoutError::InvalidEvent(_) => None,
            CheckoutError::StepFailed { step, .. } | CheckoutError::CommitPointFailed { step, .. } => {
                Some(*step)
            }
        }
    }

    /// Returns true if the order graph survived this failure.
    pub fn order_persisted(&self) -> bool {
        matches!(self, CheckoutError::CommitPointFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failed_displays_step_name() {
        let err = CheckoutError::step_failed(SagaStep::CreateOrder, "connection reset");
        assert_eq!(
            err.to_string(),
            "Checkout step 'create_order' failed: connection reset"
        );
        assert_eq!(err.step(), Some(SagaStep::CreateOrder));
        assert!(!err.order_persisted());
    }

    #[test]
    fn commit_point_failure_keeps_order() {
        let err = CheckoutError::commit_point_failed(SagaStep::UpdateStock, "deadlock");
        assert!(err.order_persisted());
    }

    #[test]
    fn invalid_event_has_no_step() {
        let err = CheckoutError::InvalidEvent("missing email".to_string());
        assert_eq!(err.step(), None);
    }
}
