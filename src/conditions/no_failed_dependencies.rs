//! # Dependency-failure gate.
//!
//! The opt-in counterpart of
//! [`NoCancelledDependencies`](crate::NoCancelledDependencies) for errors:
//! fails the conditioned operation when any dependency finished carrying
//! errors.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::core::Operation;

const NAME: &str = "NoFailedDependencies";

/// Fails the conditioned operation when any of its dependencies aggregated
/// at least one error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFailedDependencies;

#[async_trait]
impl Condition for NoFailedDependencies {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(NAME)
    }

    async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult {
        let failed = operation
            .dependencies()
            .iter()
            .filter(|dep| !dep.errors().is_empty())
            .count();
        if failed > 0 {
            ConditionResult::failed(NAME, format!("{failed} dependencies failed"))
        } else {
            ConditionResult::Satisfied
        }
    }
}
