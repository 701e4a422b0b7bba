//! # Logical negation of another condition.
//!
//! Useful when an operation should only run while some prerequisite does
//! *not* hold (e.g. run a fallback while the network is unreachable).

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::core::Operation;

/// Swaps another condition's outcome: satisfied becomes failed and failed
/// becomes satisfied. The negated condition's injected dependency is
/// forwarded unchanged.
pub struct NegatedCondition<C> {
    condition: C,
}

impl<C: Condition> NegatedCondition<C> {
    /// Creates a condition negating `condition`.
    pub fn new(condition: C) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl<C: Condition> Condition for NegatedCondition<C> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("Not<{}>", self.condition.name()))
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.condition.is_mutually_exclusive()
    }

    fn dependency(&self, operation: &Arc<Operation>) -> Option<Arc<Operation>> {
        self.condition.dependency(operation)
    }

    async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult {
        match self.condition.evaluate(operation).await {
            // The composed condition failed, so this one succeeded.
            ConditionResult::Failed(_) => ConditionResult::Satisfied,
            // The composed condition succeeded, so this one failed.
            ConditionResult::Satisfied => ConditionResult::failed(
                self.name(),
                format!("negated condition {} was satisfied", self.condition.name()),
            ),
        }
    }
}
