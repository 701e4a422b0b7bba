//! # Condition contract.
//!
//! A condition gates an operation's execution: after the operation's
//! dependencies finish, every attached condition is evaluated concurrently,
//! and any failure finishes the operation (non-cancelled) with the
//! aggregated errors instead of running it.
//!
//! A condition may also *inject a dependency*: a prerequisite operation the
//! queue will automatically add and submit ahead of the conditioned
//! operation. And a condition type may be *mutually exclusive*: all
//! operations carrying it share one exclusivity category (keyed by the
//! condition's name) and execute serialized in registration order.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Operation;
use crate::error::OperationError;

/// Whether a condition was satisfied, or failed with an error.
#[derive(Debug, Clone)]
pub enum ConditionResult {
    /// The condition was satisfied; continue execution.
    Satisfied,
    /// The condition failed; abort execution with the given error.
    Failed(OperationError),
}

impl ConditionResult {
    /// Builds a failed result from a condition name and reason.
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConditionResult::Failed(OperationError::condition_failed(name, reason))
    }

    /// The failure error, if any.
    pub fn into_error(self) -> Option<OperationError> {
        match self {
            ConditionResult::Satisfied => None,
            ConditionResult::Failed(error) => Some(error),
        }
    }
}

/// A pluggable gate evaluated before an operation runs.
///
/// `name` and `is_mutually_exclusive` are properties of the condition
/// *type*: every instance of a given condition type must report the same
/// values, since the name doubles as the exclusivity category key.
#[async_trait]
pub trait Condition: Send + Sync + 'static {
    /// The condition's name; tags produced errors and keys the exclusivity
    /// category for mutually exclusive condition types.
    fn name(&self) -> Cow<'static, str>;

    /// Whether operations carrying this condition type may never execute
    /// concurrently with one another.
    fn is_mutually_exclusive(&self) -> bool {
        false
    }

    /// An operation that must run before this condition's operation, or
    /// `None`. The queue adds it as a dependency and submits it as well.
    ///
    /// At most one dependency per condition instance; express several
    /// prerequisites as several conditions (or one group operation).
    fn dependency(&self, operation: &Arc<Operation>) -> Option<Arc<Operation>> {
        let _ = operation;
        None
    }

    /// Evaluates the condition for `operation`.
    ///
    /// Runs concurrently with the operation's other conditions; each
    /// evaluation yields exactly one result.
    async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult;
}
