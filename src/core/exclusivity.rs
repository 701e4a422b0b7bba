//! # Mutual-exclusion controller: serializes operations by category.
//!
//! Operations that declare a mutually exclusive category may not overlap
//! with other operations in the same category. The controller keeps one
//! chain per category name and serializes entrants through the dependency
//! graph: each registered operation gains a dependency on the previous
//! chain tail, so the category runs strictly FIFO in registration order.
//!
//! ## Rules
//! - Registration happens before the operation is enqueued, so the injected
//!   dependency participates in its dependency wait.
//! - Release happens when the operation finishes; dependents of the chain
//!   tail are unblocked through the ordinary done latch.
//! - A controller shared between queues extends exclusivity across them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::Operation;
use crate::sync::SyncCell;

/// Serializes operations that share mutually exclusive category names.
#[derive(Debug, Default)]
pub struct ExclusivityController {
    categories: SyncCell<HashMap<String, Vec<Arc<Operation>>>>,
}

impl ExclusivityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the operation to each category chain, making it depend on
    /// the previous tail so entrants in a category never overlap.
    pub(crate) fn register(&self, operation: &Arc<Operation>, categories: &[String]) {
        self.categories.with(|map| {
            for category in categories {
                let chain = map.entry(category.clone()).or_default();
                if let Some(tail) = chain.last() {
                    operation.add_dependency(Arc::clone(tail));
                }
                chain.push(Arc::clone(operation));
            }
        });
    }

    /// Removes a finished operation from its category chains. Empty chains
    /// are dropped so category names do not accumulate.
    pub(crate) fn release(&self, operation: &Operation, categories: &[String]) {
        self.categories.with(|map| {
            for category in categories {
                if let Some(chain) = map.get_mut(category) {
                    chain.retain(|held| held.id() != operation.id());
                    if chain.is_empty() {
                        map.remove(category);
                    }
                }
            }
        });
    }

    /// Number of operations currently registered under a category.
    pub fn chain_len(&self, category: &str) -> usize {
        self.categories
            .with(|map| map.get(category).map_or(0, Vec::len))
    }
}
