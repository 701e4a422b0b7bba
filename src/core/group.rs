//! # Group operation: a single operation wrapping a set of children.
//!
//! A group finishes when every child has finished, making a whole subgraph
//! addressable as one unit: give it dependencies, conditions, observers, or
//! cancel it to cancel all of its children.
//!
//! ## Rules
//! - Children run on the group's worker pool once the group itself starts.
//! - Operations produced by a child fold back into the group.
//! - Cancelling the group cancels every child; the group then concludes as
//!   cancelled regardless of how far the children got.
//! - Adding to a finished group is a programming error; adding to a running
//!   group schedules the child immediately.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::core::pool::WorkerPool;
use crate::core::{Execute, Operation};
use crate::observers::BlockObserver;
use crate::sync::{CompletionGroup, SyncCell};

/// An operation that completes when all of its child operations have.
///
/// Derefs to its underlying [`Operation`] handle, so the whole operation
/// surface (dependencies, conditions, observers, cancel, wait) applies.
#[derive(Clone)]
pub struct GroupOperation {
    op: Arc<Operation>,
    inner: Arc<GroupInner>,
}

impl GroupOperation {
    pub fn new(children: impl IntoIterator<Item = Arc<Operation>>) -> Self {
        let inner = Arc::new_cyclic(|weak| GroupInner {
            weak_self: weak.clone(),
            group: CompletionGroup::new(),
            children: SyncCell::new(Roster {
                members: children.into_iter().collect(),
                scheduling: false,
            }),
        });
        let op = Operation::with_body(Arc::clone(&inner) as Arc<dyn Execute>);
        Self { op, inner }
    }

    /// Adds a child. Before the group starts the child is held back; while
    /// the group runs it is scheduled immediately.
    ///
    /// # Panics
    /// Debug builds panic when the group has already finished.
    pub fn add_operation(&self, operation: Arc<Operation>) {
        self.inner.add(operation, &self.op);
    }

    pub fn add_operations(&self, operations: impl IntoIterator<Item = Arc<Operation>>) {
        for operation in operations {
            self.add_operation(operation);
        }
    }

    /// The underlying operation handle, for submitting to a queue.
    pub fn handle(&self) -> &Arc<Operation> {
        &self.op
    }
}

impl Deref for GroupOperation {
    type Target = Arc<Operation>;

    fn deref(&self) -> &Arc<Operation> {
        &self.op
    }
}

impl std::fmt::Debug for GroupOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupOperation")
            .field("op", &self.op)
            .field("children", &self.inner.children.with(|roster| roster.members.len()))
            .finish()
    }
}

struct GroupInner {
    weak_self: Weak<GroupInner>,
    /// Tracks outstanding children; the group finishes when it drains.
    group: CompletionGroup,
    children: SyncCell<Roster>,
}

/// Child list plus the scheduling flag, mutated together under one lock so
/// a child added while the group starts is scheduled exactly once.
#[derive(Default)]
struct Roster {
    members: Vec<Arc<Operation>>,
    scheduling: bool,
}

impl GroupInner {
    /// Schedules a child onto the group's pool, counted against the
    /// completion group and wired to fold its produced operations back in.
    fn include(&self, child: &Arc<Operation>, operation: &Arc<Operation>, pool: &WorkerPool) {
        let weak_inner = self.weak_self.clone();
        let weak_op = Arc::downgrade(operation);
        child.add_observer(BlockObserver::on_produce(move |_, produced| {
            if let (Some(inner), Some(op)) = (weak_inner.upgrade(), weak_op.upgrade()) {
                inner.add(Arc::clone(produced), &op);
            }
        }));
        child.enqueue(pool, Some(self.group.clone()));
    }

    fn add(&self, child: Arc<Operation>, operation: &Arc<Operation>) {
        debug_assert!(
            !operation.is_finished(),
            "cannot add children to a finished group"
        );
        let live = self.children.with(|roster| {
            roster.members.push(Arc::clone(&child));
            roster.scheduling
        });
        if live {
            if let Some(pool) = operation.pool() {
                self.include(&child, operation, &pool);
            }
        }
    }
}

#[async_trait]
impl Execute for GroupInner {
    async fn execute(&self, operation: &Arc<Operation>) {
        let Some(pool) = operation.pool() else {
            operation.finish();
            return;
        };
        let batch = self.children.with(|roster| {
            roster.scheduling = true;
            roster.members.clone()
        });
        for child in &batch {
            self.include(child, operation, &pool);
        }
        tokio::select! {
            // Cancelled externally; the cancellation hook already told the
            // children to stop.
            _ = operation.wait() => {}
            _ = self.group.wait() => {
                if !operation.is_cancelled() {
                    operation.finish();
                }
            }
        }
    }

    fn handle_cancellation(&self, _operation: &Arc<Operation>) {
        let members = self.children.with(|roster| roster.members.clone());
        for child in members {
            child.cancel();
        }
    }
}
