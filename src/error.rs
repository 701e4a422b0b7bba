//! Error types collected by operations during their lifecycle.
//!
//! [`OperationError`] is data, not control flow: errors never cross operation
//! boundaries. They are appended to the owning operation's error list and
//! surfaced to observers at finish time. Programming errors (mutating a
//! dependency list after scheduling began, double-submitting an operation,
//! and the like) are assertions instead and never appear here.

use std::time::Duration;

use thiserror::Error;

/// An error recorded against a single operation.
///
/// Condition failures drive the operation to a *non-cancelled* finish that
/// carries errors; cancellation is a separate terminal path that may
/// optionally attach errors (e.g. [`OperationError::Timeout`] from a
/// timeout observer).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// A condition evaluated to failed; the operation never ran.
    #[error("condition {name} failed: {reason}")]
    ConditionFailed {
        /// Name of the failing condition.
        name: String,
        /// Human-readable failure detail.
        reason: String,
    },

    /// Condition evaluation was aborted because the operation was cancelled
    /// mid-evaluation with no other error recorded.
    #[error("condition evaluation aborted by cancellation")]
    ConditionsAborted,

    /// The operation was cancelled by a timeout observer.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The operation's own work failed.
    #[error("execution failed: {message}")]
    Failed {
        /// The underlying error message.
        message: String,
    },
}

impl OperationError {
    /// Builds a [`OperationError::ConditionFailed`] from a condition name and reason.
    pub fn condition_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        OperationError::ConditionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`OperationError::Failed`] from any displayable error.
    pub fn failed(message: impl ToString) -> Self {
        OperationError::Failed {
            message: message.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use opvisor::OperationError;
    ///
    /// let err = OperationError::failed("boom");
    /// assert_eq!(err.as_label(), "operation_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationError::ConditionFailed { .. } => "condition_failed",
            OperationError::ConditionsAborted => "conditions_aborted",
            OperationError::Timeout { .. } => "operation_timeout",
            OperationError::Failed { .. } => "operation_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            OperationError::ConditionFailed { name, reason } => {
                format!("condition {name} failed: {reason}")
            }
            OperationError::ConditionsAborted => "conditions aborted".to_string(),
            OperationError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            OperationError::Failed { message } => format!("error: {message}"),
        }
    }

    /// The name of the failing condition, if this error came from one.
    pub fn condition_name(&self) -> Option<&str> {
        match self {
            OperationError::ConditionFailed { name, .. } => Some(name),
            _ => None,
        }
    }
}
