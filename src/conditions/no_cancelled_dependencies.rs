//! # Dependency-cancellation gate.
//!
//! Dependency completion only ever means "ready to evaluate", not
//! "succeeded": the framework itself never fails an operation because a
//! dependency was cancelled. This condition opts into that policy.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::core::Operation;

const NAME: &str = "NoCancelledDependencies";

/// Fails the conditioned operation when any of its dependencies was
/// cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCancelledDependencies;

#[async_trait]
impl Condition for NoCancelledDependencies {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(NAME)
    }

    async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult {
        let cancelled = operation
            .dependencies()
            .iter()
            .filter(|dep| dep.is_cancelled())
            .count();
        if cancelled > 0 {
            ConditionResult::failed(NAME, format!("{cancelled} dependencies were cancelled"))
        } else {
            ConditionResult::Satisfied
        }
    }
}
