//! # Operation: the state machine and lifecycle engine for one unit of work.
//!
//! An operation is an isolated piece of work with dependencies, conditions
//! and observers, enqueued on an [`OperationQueue`](crate::OperationQueue)
//! and executed on its worker pool.
//!
//! ## Lifecycle
//! ```text
//! enqueue ──► run():
//!   ├─► guard: cancelled? ─► stop (cancel path owns the terminal state)
//!   ├─► WaitingForDependencies
//!   │     select( own done latch, join_all(dependency done latches) )
//!   ├─► guard: cancelled? ─► stop
//!   ├─► EvaluatingConditions
//!   │     fan-out: evaluate every condition concurrently
//!   │     fan-in:  any failure ─► finish(errors), non-cancelled
//!   ├─► guard: cancelled? ─► stop
//!   └─► Running
//!         observers.on_start ─► body.execute()
//!               └─ body must eventually call finish()/cancel() exactly once
//!
//! finish(cancelled, errors):   (idempotent; first call wins)
//!   hook (handle_cancellation | handle_finishing)
//!   append errors ─► publish Finished{cancelled}
//!   did_finish ─► observers.on_finish(snapshot)
//!   fire done latch ─► release observers + pool handle
//! ```
//!
//! ## Rules
//! - Dependencies are mutable only before the operation starts waiting on
//!   them; conditions only before evaluation begins. Later mutation is a
//!   programming error (asserted in debug builds).
//! - Observers may be added at any time. Adding one to an already finished
//!   operation invokes its finish hook immediately, exactly once, with the
//!   stored outcome; the observer is not retained.
//! - No lock is held while caller-supplied code runs (observers, condition
//!   evaluation, the execute body). Notifications iterate snapshots.
//! - The done latch fires after observers were notified; dependents never
//!   observe a partially finished operation.
//! - Dependency graphs must be acyclic. A cycle or self-dependency deadlocks
//!   the involved operations; no detection is performed (caller contract).

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future;
use tokio_util::sync::CancellationToken;

use crate::conditions::{Condition, ConditionResult};
use crate::core::pool::WorkerPool;
use crate::core::state::State;
use crate::error::OperationError;
use crate::observers::Observer;
use crate::sync::{CompletionGroup, SyncCell};

/// The work body of an [`Operation`], plus its lifecycle hooks.
///
/// `execute` performs the actual work and must eventually call
/// [`Operation::finish`] (or one of its variants) exactly once, directly or
/// from a task it spawned. The hooks are extension points used by composite
/// operations (see [`GroupOperation`](crate::GroupOperation)); leaf bodies
/// usually keep the defaults.
#[async_trait]
pub trait Execute: Send + Sync + 'static {
    /// Performs the operation's main work.
    ///
    /// Runs at most once, after dependencies finished and conditions were
    /// satisfied. Long-running bodies should poll
    /// [`Operation::is_cancelled`] and abort early; the framework never
    /// preempts a running body.
    async fn execute(&self, operation: &Arc<Operation>);

    /// Runs before the terminal state is published when the operation is
    /// cancelled.
    fn handle_cancellation(&self, operation: &Arc<Operation>) {
        let _ = operation;
    }

    /// Runs before the terminal state is published on a normal finish.
    fn handle_finishing(&self, operation: &Arc<Operation>) {
        let _ = operation;
    }

    /// Runs right after the terminal state was published, before observers
    /// are notified, with the final `(cancelled, errors)` outcome.
    fn did_finish(&self, operation: &Arc<Operation>, cancelled: bool, errors: &[OperationError]) {
        let _ = (operation, cancelled, errors);
    }
}

/// A unit of schedulable, cancellable work.
///
/// Operations are identified per instance (see [`Operation::id`]) and shared
/// as `Arc<Operation>`. Construct one from an [`Execute`] body, or use the
/// leaf constructors ([`BlockOperation`](crate::BlockOperation),
/// [`DelayOperation`](crate::DelayOperation)).
pub struct Operation {
    weak_self: Weak<Operation>,
    body: Arc<dyn Execute>,
    state: SyncCell<State>,
    dependencies: SyncCell<Vec<Arc<Operation>>>,
    conditions: SyncCell<Vec<Arc<dyn Condition>>>,
    observers: SyncCell<Vec<Arc<dyn Observer>>>,
    errors: SyncCell<Vec<OperationError>>,
    pool: SyncCell<Option<WorkerPool>>,
    /// Completion latch: fired exactly once when the operation reaches
    /// `Finished`, cancelled or not. Dependents and group bookkeeping wait
    /// on it.
    done: CancellationToken,
}

impl Operation {
    /// Creates a new operation from the given body.
    pub fn new(body: impl Execute) -> Arc<Self> {
        Self::with_body(Arc::new(body))
    }

    /// Creates a new operation from an already shared body.
    pub fn with_body(body: Arc<dyn Execute>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            body,
            state: SyncCell::new(State::Created),
            dependencies: SyncCell::new(Vec::new()),
            conditions: SyncCell::new(Vec::new()),
            observers: SyncCell::new(Vec::new()),
            errors: SyncCell::new(Vec::new()),
            pool: SyncCell::new(None),
            done: CancellationToken::new(),
        })
    }

    /// Per-instance identity. Two operations are never equal by value.
    pub fn id(&self) -> usize {
        self as *const Operation as usize
    }

    /// Whether the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.with(|s| s.is_cancelled())
    }

    /// Whether the operation has reached its terminal state. Also `true`
    /// when the operation was cancelled.
    pub fn is_finished(&self) -> bool {
        self.state.with(|s| s.is_finished())
    }

    /// Snapshot of the operation's dependencies.
    pub fn dependencies(&self) -> Vec<Arc<Operation>> {
        self.dependencies.read()
    }

    /// Snapshot of the operation's conditions.
    pub fn conditions(&self) -> Vec<Arc<dyn Condition>> {
        self.conditions.read()
    }

    /// Snapshot of the errors aggregated so far.
    pub fn errors(&self) -> Vec<OperationError> {
        self.errors.read()
    }

    pub(crate) fn pool(&self) -> Option<WorkerPool> {
        self.pool.read()
    }

    // ---------------------------
    // Graph construction
    // ---------------------------

    /// Adds a dependency: `dependency` must reach `Finished` (cancelled or
    /// not) before this operation leaves its dependency wait.
    ///
    /// Must not be called once the operation has started waiting on its
    /// dependencies.
    pub fn add_dependency(&self, dependency: Arc<Operation>) {
        self.dependencies.coordinated(&self.state, |deps, state| {
            debug_assert!(
                state.rank() < State::WaitingForDependencies.rank(),
                "cannot modify dependencies after execution has begun (state: {state})"
            );
            deps.push(dependency);
        });
    }

    /// Removes a previously added dependency (matched by identity).
    ///
    /// Must not be called once the operation has started waiting on its
    /// dependencies.
    pub fn remove_dependency(&self, dependency: &Arc<Operation>) {
        self.dependencies.coordinated(&self.state, |deps, state| {
            debug_assert!(
                state.rank() < State::WaitingForDependencies.rank(),
                "cannot modify dependencies after execution has begun (state: {state})"
            );
            deps.retain(|d| !Arc::ptr_eq(d, dependency));
        });
    }

    /// Adds a condition gating this operation's execution.
    ///
    /// Must not be called once condition evaluation has begun.
    pub fn add_condition(&self, condition: impl Condition) {
        self.conditions.coordinated(&self.state, |conditions, state| {
            debug_assert!(
                state.rank() < State::EvaluatingConditions.rank(),
                "cannot modify conditions after evaluation has begun (state: {state})"
            );
            conditions.push(Arc::new(condition));
        });
    }

    /// Adds an observer. If the operation already finished, the observer is
    /// not stored; its finish hook fires immediately with the stored
    /// outcome, exactly once.
    pub fn add_observer(&self, observer: impl Observer) {
        let observer: Arc<dyn Observer> = Arc::new(observer);
        let finished = self.observers.coordinated(&self.state, |observers, state| {
            if state.is_finished() {
                Some(state.is_cancelled())
            } else {
                observers.push(Arc::clone(&observer));
                None
            }
        });
        if let Some(cancelled) = finished {
            if let Some(this) = self.weak_self.upgrade() {
                observer.on_finish(&this, cancelled, &self.errors());
            }
        }
    }

    // ---------------------------
    // Errors
    // ---------------------------

    /// Appends an error to this operation's error list.
    pub fn aggregate_error(&self, error: OperationError) {
        self.errors.with(|errors| errors.push(error));
    }

    /// Appends a collection of errors to this operation's error list.
    pub fn aggregate_errors(&self, new_errors: impl IntoIterator<Item = OperationError>) {
        self.errors.with(|errors| errors.extend(new_errors));
    }

    // ---------------------------
    // Dynamic production
    // ---------------------------

    /// Notifies all observers that this operation spawned `operation`
    /// mid-execution. A queue-managed operation's produced operations are
    /// re-submitted onto the same queue by the queue's bookkeeping observer.
    pub fn produce(&self, operation: Arc<Operation>) {
        let Some(this) = self.weak_self.upgrade() else {
            return;
        };
        for observer in self.observers.read() {
            observer.on_produce(&this, &operation);
        }
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Hands the operation to `pool`, optionally counting its completion
    /// against `group`. Called by the owning queue or group.
    pub(crate) fn enqueue(&self, pool: &WorkerPool, group: Option<CompletionGroup>) {
        if self.is_cancelled() {
            return;
        }
        let proceed = self.pool.coordinated(&self.state, |slot, state| {
            if state.is_concluding() {
                return false;
            }
            debug_assert!(
                state.rank() < State::Enqueued.rank(),
                "operation is already enqueued (state: {state})"
            );
            *state = State::Enqueued;
            *slot = Some(pool.clone());
            true
        });
        if !proceed {
            return;
        }

        let Some(this) = self.weak_self.upgrade() else {
            return;
        };
        if let Some(group) = &group {
            group.enter();
        }
        pool.dispatch(async move {
            Arc::clone(&this).run().await;
            if let Some(group) = group {
                // The run sequence may hand off to the body; the group is
                // left only once the operation actually finishes.
                this.done.cancelled().await;
                group.leave();
            }
        });
    }

    /// The run sequence, invoked once by the worker pool after enqueue.
    async fn run(self: Arc<Self>) {
        if self.is_cancelled() {
            return;
        }
        if !self.advance(State::WaitingForDependencies) {
            return;
        }
        self.wait_for_dependencies().await;

        if self.is_cancelled() {
            return;
        }
        if !self.advance(State::EvaluatingConditions) {
            return;
        }
        if !self.evaluate_conditions().await {
            return;
        }

        if self.is_cancelled() {
            return;
        }
        if !self.advance(State::Running) {
            return;
        }
        for observer in self.observers.read() {
            observer.on_start(&self);
        }
        let body = Arc::clone(&self.body);
        body.execute(&self).await;
    }

    /// Forward transition; refused once finish processing has begun.
    fn advance(&self, next: State) -> bool {
        self.state.with(|state| {
            if state.is_concluding() {
                return false;
            }
            debug_assert!(
                state.rank() < next.rank(),
                "out-of-order state transition: {state} -> {next}"
            );
            *state = next;
            true
        })
    }

    /// Suspends until every dependency fired its done latch, or until this
    /// operation is finished (a concurrent cancel unblocks the wait
    /// promptly; dropping the fan-in future deregisters every waiter).
    async fn wait_for_dependencies(&self) {
        let dependencies = self.dependencies();
        if dependencies.is_empty() {
            return;
        }
        let all_done = future::join_all(dependencies.iter().map(|dep| dep.done.cancelled()));
        tokio::select! {
            _ = self.done.cancelled() => {}
            _ = all_done => {}
        }
    }

    /// Concurrent condition fan-out/fan-in. Returns whether the run sequence
    /// should proceed to `Running`.
    async fn evaluate_conditions(self: &Arc<Self>) -> bool {
        let conditions = self.conditions();
        if conditions.is_empty() {
            return true;
        }

        let results =
            future::join_all(conditions.iter().map(|condition| condition.evaluate(self))).await;

        let failures: Vec<OperationError> = results
            .into_iter()
            .filter_map(ConditionResult::into_error)
            .collect();
        if !failures.is_empty() {
            // A failed condition is a normal, non-cancelled finish carrying
            // errors. (No-op if a concurrent cancel already concluded.)
            self.conclude(false, failures);
            return false;
        }
        true
    }

    // ---------------------------
    // Finishing
    // ---------------------------

    /// Finishes the operation without errors.
    pub fn finish(&self) {
        self.conclude(false, Vec::new());
    }

    /// Finishes the operation with a list of errors (may be empty).
    pub fn finish_with(&self, errors: impl IntoIterator<Item = OperationError>) {
        self.conclude(false, errors.into_iter().collect());
    }

    /// Cancels the operation. Safe to call from any thread, in any state;
    /// only the first finish or cancel takes effect.
    pub fn cancel(&self) {
        self.conclude(true, Vec::new());
    }

    /// Cancels the operation, attaching errors describing the reason.
    pub fn cancel_with(&self, errors: impl IntoIterator<Item = OperationError>) {
        self.conclude(true, errors.into_iter().collect());
    }

    /// Waits until the operation reaches `Finished` (cancelled or not).
    pub async fn wait(&self) {
        self.done.cancelled().await;
    }

    fn conclude(&self, cancelled: bool, errors: Vec<OperationError>) {
        let previous = self.state.with(|state| {
            if state.is_concluding() {
                return None;
            }
            debug_assert!(
                cancelled || state.rank() > State::Enqueued.rank(),
                "finishing an operation that never started (state: {state})"
            );
            let previous = *state;
            *state = State::Finishing { cancelled };
            Some(previous)
        });
        let Some(previous) = previous else {
            return;
        };

        let Some(this) = self.weak_self.upgrade() else {
            return;
        };
        if cancelled {
            self.body.handle_cancellation(&this);
        } else {
            self.body.handle_finishing(&this);
        }

        self.errors.with(|list| {
            list.extend(errors);
            if cancelled && list.is_empty() && previous == State::EvaluatingConditions {
                // Cancelled mid-evaluation with no reason recorded: leave a
                // marker so consumers can tell this apart from a clean
                // cancel. Appended here so observers and later `errors()`
                // reads agree on the final list.
                list.push(OperationError::ConditionsAborted);
            }
        });
        let errors = self.errors.read();
        self.state.with(|state| *state = State::Finished { cancelled });

        self.body.did_finish(&this, cancelled, &errors);
        let observers = self.observers.with(std::mem::take);
        for observer in &observers {
            observer.on_finish(&this, cancelled, &errors);
        }

        // Release dependents only after observers ran, then drop references
        // that would otherwise keep the queue alive.
        self.done.cancel();
        self.pool.with(|slot| *slot = None);
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("state", &format_args!("{}", self.state.read()))
            .field("dependencies", &self.dependencies.with(|d| d.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::conditions::ConditionResult;
    use crate::observers::BlockObserver;
    use crate::operations::BlockOperation;

    struct FailingCondition;

    #[async_trait]
    impl Condition for FailingCondition {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("Failing")
        }

        async fn evaluate(&self, _operation: &Arc<Operation>) -> ConditionResult {
            ConditionResult::Failed(OperationError::condition_failed("Failing", "always fails"))
        }
    }

    #[tokio::test]
    async fn test_dependencies_finish_before_dependent_runs() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let pool = WorkerPool::new();

        let trace = Arc::clone(&order);
        let first = BlockOperation::arc(move |_op| async move {
            trace.lock().unwrap().push("first");
            Ok(())
        });
        let trace = Arc::clone(&order);
        let second = BlockOperation::arc(move |_op| async move {
            trace.lock().unwrap().push("second");
            Ok(())
        });
        second.add_dependency(Arc::clone(&first));

        // Enqueue the dependent before its dependency.
        second.enqueue(&pool, None);
        first.enqueue(&pool, None);
        second.wait().await;

        assert_eq!(*order.lock().unwrap(), ["first", "second"]);
        assert!(first.is_finished());
        assert!(!second.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_condition_finishes_without_running_body() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new();

        let counter = Arc::clone(&ran);
        let op = BlockOperation::arc(move |_op| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        op.add_condition(FailingCondition);

        op.enqueue(&pool, None);
        op.wait().await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(op.is_finished());
        assert!(!op.is_cancelled(), "condition failure is not a cancellation");
        assert_eq!(
            op.errors(),
            [OperationError::condition_failed("Failing", "always fails")]
        );
    }

    struct WaitsForConclusion;

    #[async_trait]
    impl Condition for WaitsForConclusion {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("WaitsForConclusion")
        }

        async fn evaluate(&self, operation: &Arc<Operation>) -> ConditionResult {
            operation.wait().await;
            ConditionResult::Satisfied
        }
    }

    #[tokio::test]
    async fn test_cancel_during_evaluation_records_aborted_marker() {
        let pool = WorkerPool::new();
        let notified = Arc::new(StdMutex::new(Vec::new()));

        let op = BlockOperation::arc(|_op| async { Ok(()) });
        op.add_condition(WaitsForConclusion);
        let sink = Arc::clone(&notified);
        op.add_observer(BlockObserver::on_finish(move |_, cancelled, errors| {
            assert!(cancelled);
            sink.lock().unwrap().extend_from_slice(errors);
        }));

        op.enqueue(&pool, None);
        // Let the run sequence reach the condition fan-in before cancelling.
        tokio::task::yield_now().await;
        op.cancel();
        op.wait().await;
        // Let the suspended evaluation resume and unwind.
        tokio::task::yield_now().await;

        // The marker is part of the published outcome: observers saw it, and
        // the error list does not change after the finish.
        assert_eq!(*notified.lock().unwrap(), [OperationError::ConditionsAborted]);
        assert_eq!(op.errors(), [OperationError::ConditionsAborted]);
    }

    #[tokio::test]
    async fn test_cancel_with_reason_during_evaluation_keeps_reason_only() {
        let pool = WorkerPool::new();

        let op = BlockOperation::arc(|_op| async { Ok(()) });
        op.add_condition(WaitsForConclusion);

        op.enqueue(&pool, None);
        tokio::task::yield_now().await;
        op.cancel_with([OperationError::failed("shutting down")]);
        op.wait().await;
        tokio::task::yield_now().await;

        assert_eq!(op.errors(), [OperationError::failed("shutting down")]);
    }

    #[tokio::test]
    async fn test_finish_and_cancel_are_idempotent() {
        let finishes = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new();

        let op = BlockOperation::arc(|op| async move {
            // Finish explicitly; the wrapper's own finish must become a no-op.
            op.finish();
            op.cancel();
            Ok(())
        });
        let counter = Arc::clone(&finishes);
        op.add_observer(BlockObserver::on_finish(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        op.enqueue(&pool, None);
        op.wait().await;

        assert_eq!(finishes.load(Ordering::SeqCst), 1);
        assert!(op.is_finished());
        assert!(!op.is_cancelled(), "first conclusion was a finish, later cancel lost");
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch_skips_body() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new();
        pool.suspend();

        let counter = Arc::clone(&ran);
        let op = BlockOperation::arc(move |_op| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        op.enqueue(&pool, None);
        op.cancel();
        op.wait().await;
        pool.resume();
        tokio::task::yield_now().await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(op.is_cancelled());
        assert!(op.is_finished());
    }

    #[tokio::test]
    async fn test_observer_added_after_finish_fires_immediately() {
        let pool = WorkerPool::new();
        let op = BlockOperation::arc(|_op| async { Ok(()) });
        op.enqueue(&pool, None);
        op.wait().await;

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        op.add_observer(BlockObserver::on_finish(move |_, cancelled, _| {
            assert!(!cancelled);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_dependency_wait() {
        let pool = WorkerPool::new();
        let never = BlockOperation::arc(|op| async move {
            op.wait().await;
            Ok(())
        });
        let op = BlockOperation::arc(|_op| async { Ok(()) });
        op.add_dependency(Arc::clone(&never));

        op.enqueue(&pool, None);
        tokio::task::yield_now().await;
        op.cancel();
        op.wait().await;

        assert!(op.is_cancelled());
        never.cancel();
    }

    #[tokio::test]
    async fn test_errors_carry_execution_failure() {
        let pool = WorkerPool::new();
        let op = BlockOperation::arc(|_op| async {
            Err(OperationError::failed("disk on fire"))
        });
        op.enqueue(&pool, None);
        op.wait().await;

        assert!(op.is_finished());
        assert!(!op.is_cancelled());
        assert_eq!(op.errors(), [OperationError::failed("disk on fire")]);
    }
}
