//! # Silencing wrapper.
//!
//! Forwards another condition's evaluation but suppresses its injected
//! dependency. Useful when a condition would normally enqueue a preparatory
//! operation (e.g. a permission prompt) that the caller wants to avoid:
//! the check still runs, the side effect does not.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::core::Operation;

/// Wraps a condition, dropping its injected dependency.
pub struct SilentCondition<C> {
    condition: C,
}

impl<C: Condition> SilentCondition<C> {
    /// Creates a silencing wrapper around `condition`.
    pub fn new(condition: C) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl<C: Condition> Condition for SilentCondition<C> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("Silent<{}>", self.condition.name()))
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.condition.is_mutually_exclusive()
    }

    // dependency(): deliberately the default. We never inject one.

    async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult {
        self.condition.evaluate(operation).await
    }
}
