//! # Operation queue: submission surface over the worker pool.
//!
//! ```text
//!   add_operation(op)
//!        │
//!        ▼
//!   ┌───────────────────────────────────────────────┐
//!   │ OperationQueue                                │
//!   │   1. track op in the live set                 │
//!   │   2. attach bookkeeping observer              │
//!   │   3. submit condition-injected dependencies   │
//!   │   4. register mutually exclusive categories   │
//!   │   5. hand op to the WorkerPool                │
//!   └───────────────────────────────────────────────┘
//!        │                                  ▲
//!        ▼                                  │ on_finish
//!   WorkerPool ──── runs op ──── Operation ─┘
//! ```
//!
//! ## Rules
//! - An operation is submitted to at most one queue, exactly once.
//! - Produced operations are re-submitted onto the producing operation's
//!   queue automatically.
//! - Suspension defers execution, not submission: a suspended queue keeps
//!   accepting operations and releases them on resume. Cancellation still
//!   concludes operations while suspended.
//! - The queue drops its reference to each operation once it finishes; it
//!   retains nothing forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use crate::core::exclusivity::ExclusivityController;
use crate::core::pool::WorkerPool;
use crate::core::Operation;
use crate::error::OperationError;
use crate::observers::{BlockObserver, Observer};
use crate::sync::{CompletionGroup, SyncCell};

tokio::task_local! {
    /// Queue owning the currently executing operation, if any.
    pub(crate) static CURRENT_QUEUE: Weak<OperationQueue>;
}

/// Configures an [`OperationQueue`] before construction.
#[derive(Default)]
pub struct QueueBuilder {
    suspended: bool,
    exclusivity: Option<Arc<ExclusivityController>>,
}

impl QueueBuilder {
    /// Starts the queue suspended; operations accumulate until
    /// [`OperationQueue::resume`].
    pub fn suspended(mut self, suspended: bool) -> Self {
        self.suspended = suspended;
        self
    }

    /// Shares a mutual-exclusion controller with other queues. Queues built
    /// without one get their own private controller.
    pub fn exclusivity(mut self, controller: Arc<ExclusivityController>) -> Self {
        self.exclusivity = Some(controller);
        self
    }

    /// Builds the queue over the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime context.
    pub fn build(self) -> Arc<OperationQueue> {
        let pool = WorkerPool::new();
        if self.suspended {
            pool.suspend();
        }
        let exclusivity = self.exclusivity.unwrap_or_default();
        let queue = Arc::new_cyclic(|weak| OperationQueue {
            weak_self: weak.clone(),
            live: SyncCell::new(HashMap::new()),
            pool: pool.clone(),
            exclusivity,
            drain: CompletionGroup::new(),
        });
        pool.bind(&queue);
        queue
    }
}

/// Accepts operations and schedules them onto a worker pool, honoring
/// dependencies, conditions, and mutual exclusivity.
pub struct OperationQueue {
    weak_self: Weak<OperationQueue>,
    /// Operations submitted but not yet finished, keyed by [`Operation::id`].
    live: SyncCell<HashMap<usize, Arc<Operation>>>,
    pool: WorkerPool,
    exclusivity: Arc<ExclusivityController>,
    /// Counts live operations; idle waiters resolve when it drains.
    drain: CompletionGroup,
}

impl OperationQueue {
    /// Creates a running queue over the current tokio runtime.
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::default()
    }

    /// Queue owning the currently executing operation. `None` outside of
    /// operation execution, or when that queue has since been dropped.
    pub fn current() -> Option<Arc<OperationQueue>> {
        CURRENT_QUEUE.try_with(Weak::upgrade).ok().flatten()
    }

    fn strong(&self) -> Option<Arc<Self>> {
        self.weak_self.upgrade()
    }

    // ---------------------------
    // Submission
    // ---------------------------

    /// Submits an operation for execution.
    ///
    /// Dependencies injected by the operation's conditions are submitted
    /// alongside it; mutually exclusive conditions register the operation
    /// with the exclusivity controller before it can run.
    pub fn add_operation(&self, operation: Arc<Operation>) {
        self.live.with(|live| self.add_locked(live, operation));
    }

    /// Submits a batch of operations. Mutual-exclusion ordering between
    /// them follows batch order.
    pub fn add_operations(&self, operations: impl IntoIterator<Item = Arc<Operation>>) {
        self.live.with(|live| {
            for operation in operations {
                self.add_locked(live, operation);
            }
        });
    }

    fn add_locked(&self, live: &mut HashMap<usize, Arc<Operation>>, operation: Arc<Operation>) {
        self.drain.enter();
        if let Some(queue) = self.strong() {
            // Fires immediately if the operation already finished, which
            // settles the drain entry just made.
            operation.add_observer(QueueObserver::new(queue));
        }
        let previous = live.insert(operation.id(), Arc::clone(&operation));
        debug_assert!(
            previous.is_none(),
            "operation {operation:?} was already submitted to this queue"
        );

        // Concluded before submission (e.g. cancelled): the bookkeeping
        // observer above already settled it, and its dependency window is
        // closed. Nothing left to wire up.
        if operation.is_finished() {
            return;
        }

        for condition in operation.conditions() {
            if let Some(dependency) = condition.dependency(&operation) {
                operation.add_dependency(Arc::clone(&dependency));
                self.add_locked(live, dependency);
            }
        }

        let categories: Vec<String> = operation
            .conditions()
            .iter()
            .filter(|condition| condition.is_mutually_exclusive())
            .map(|condition| condition.name().into_owned())
            .collect();
        if !categories.is_empty() {
            self.exclusivity.register(&operation, &categories);
            let controller = Arc::clone(&self.exclusivity);
            operation.add_observer(BlockObserver::on_finish(move |finished, _, _| {
                controller.release(finished, &categories);
            }));
        }

        operation.enqueue(&self.pool, None);
    }

    // ---------------------------
    // Bookkeeping
    // ---------------------------

    /// Defers finish bookkeeping to a pool task. The finish notification
    /// may arrive while the live set is locked by submission, so it is
    /// never handled inline.
    fn schedule_finished(&self, operation: Arc<Operation>) {
        let Some(queue) = self.strong() else {
            return;
        };
        self.pool.spawn(async move {
            queue.operation_finished(&operation);
        });
    }

    fn operation_finished(&self, operation: &Arc<Operation>) {
        let removed = self.live.with(|live| live.remove(&operation.id()));
        debug_assert!(
            removed.is_some(),
            "finished operation {operation:?} was not tracked by this queue"
        );
        self.drain.leave();
    }

    // ---------------------------
    // Control
    // ---------------------------

    /// Defers execution of operations that have not started. In-flight
    /// operations keep running.
    pub fn suspend(&self) {
        self.pool.suspend();
    }

    /// Resumes execution of deferred operations.
    pub fn resume(&self) {
        self.pool.resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.pool.is_suspended()
    }

    /// Cancels every live operation. Effective even while suspended: the
    /// cancelled operations conclude without executing.
    pub fn cancel_all(&self) {
        let operations: Vec<_> = self.live.with(|live| live.values().cloned().collect());
        // Cancellation hooks may call back into the queue, so the live set
        // is not locked while cancelling.
        for operation in operations {
            operation.cancel();
        }
    }

    /// Whether the queue tracks no live operations.
    pub fn is_empty(&self) -> bool {
        self.live.with(|live| live.is_empty())
    }

    /// Waits until every submitted operation has finished and its
    /// bookkeeping settled. Resolves immediately on an empty queue;
    /// operations submitted while waiting extend the wait.
    pub async fn wait_idle(&self) {
        self.drain.wait().await;
    }
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("live", &self.live.with(|live| live.len()))
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

/// Ties a submitted operation back to its queue: re-submits produced
/// operations and triggers finish bookkeeping. The queue reference is
/// released on finish so a finished operation does not keep its queue
/// alive.
struct QueueObserver {
    queue: StdMutex<Option<Arc<OperationQueue>>>,
}

impl QueueObserver {
    fn new(queue: Arc<OperationQueue>) -> Self {
        Self {
            queue: StdMutex::new(Some(queue)),
        }
    }
}

impl Observer for QueueObserver {
    fn on_produce(&self, _operation: &Arc<Operation>, produced: &Arc<Operation>) {
        let queue = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(queue) = queue {
            queue.add_operation(Arc::clone(produced));
        }
    }

    fn on_finish(&self, operation: &Arc<Operation>, _cancelled: bool, _errors: &[OperationError]) {
        let queue = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(queue) = queue {
            queue.schedule_finished(Arc::clone(operation));
        }
    }
}
