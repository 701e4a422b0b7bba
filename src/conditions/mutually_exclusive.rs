//! # Mutual-exclusion marker condition.
//!
//! [`MutuallyExclusive<T>`] is always satisfied; it exists only to flag its
//! category. All operations carrying a `MutuallyExclusive<T>` with the same
//! `T` are serialized by the queue's
//! [`ExclusivityController`](crate::ExclusivityController), executing in
//! registration order and never concurrently.
//!
//! ## Example
//! ```
//! use opvisor::MutuallyExclusive;
//!
//! struct Database;
//!
//! // Two operations carrying this condition never run at the same time.
//! let condition = MutuallyExclusive::<Database>::new();
//! ```

use std::any::type_name;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::core::Operation;

/// Marks kinds of operations that may not execute concurrently.
///
/// `T` is a marker type naming the shared resource; the exclusivity
/// category is derived from it.
pub struct MutuallyExclusive<T: ?Sized> {
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized> MutuallyExclusive<T> {
    /// Creates the marker condition.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Default for MutuallyExclusive<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: ?Sized + 'static> Condition for MutuallyExclusive<T> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("MutuallyExclusive<{}>", type_name::<T>()))
    }

    fn is_mutually_exclusive(&self) -> bool {
        true
    }

    async fn evaluate(&self, _operation: &Arc<Operation>) -> ConditionResult {
        ConditionResult::Satisfied
    }
}
