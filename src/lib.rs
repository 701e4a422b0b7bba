//! # opvisor
//!
//! **Opvisor** is a cooperative operation framework for Rust.
//!
//! It provides primitives to build graphs of async operations with
//! dependencies, preconditions, observers, and mutual exclusivity, and a
//! queue that schedules them. The crate is designed as a building block
//! for application-level workflows.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Operation   │   │  Operation   │   │GroupOperation│
//!     │ (leaf body)  │   │ (leaf body)  │   │ (children)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  OperationQueue                                               │
//! │  - live set (tracks unfinished operations)                    │
//! │  - ExclusivityController (serializes categories)              │
//! │  - QueueObserver (produce re-submission, finish bookkeeping)  │
//! └──────┬────────────────────────────────────────────────────────┘
//!        ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  WorkerPool (tokio runtime handle + suspend gate)             │
//! └──────┬────────────────────────────────────────────────────────┘
//!        ▼
//!   Operation::run()
//!     ├─► wait for dependencies (done latches)
//!     ├─► evaluate conditions (concurrently)
//!     ├─► notify observers: on_start
//!     └─► Execute::execute(body)
//!           └─► finish / finish_with / cancel ─► observers: on_finish
//! ```
//!
//! ### Lifecycle
//! ```text
//! Created ──► Enqueued ──► WaitingForDependencies ──► EvaluatingConditions
//!                                                            │
//!                         conditions satisfied ◄─────────────┤
//!                                │                           │ any failed
//!                                ▼                           ▼
//!                             Running ──────────────► Finishing{cancelled}
//!                                                            │
//!                                                            ▼
//!                                                   Finished{cancelled}
//!
//! - cancel() is accepted in every state and jumps to Finishing{true};
//!   the first of finish/cancel wins, later calls are no-ops.
//! - The done latch fires once, at Finished; dependents and groups wait
//!   on it.
//! ```
//!
//! ## Features
//! | Area            | Description                                                       | Key types / traits                            |
//! |-----------------|-------------------------------------------------------------------|-----------------------------------------------|
//! | **Operations**  | Units of async work with state, dependencies, and errors.         | [`Operation`], [`Execute`]                    |
//! | **Queueing**    | Submission, suspension, draining, current-queue lookup.           | [`OperationQueue`], [`QueueBuilder`]          |
//! | **Conditions**  | Preconditions evaluated before execution.                         | [`Condition`], [`ConditionResult`]            |
//! | **Observers**   | Hooks into start, produce, and finish.                            | [`Observer`], [`BlockObserver`]               |
//! | **Exclusivity** | At most one operation per category at a time.                     | [`MutuallyExclusive`], [`ExclusivityController`] |
//! | **Grouping**    | Many operations addressed as one.                                 | [`GroupOperation`], [`CompletionGroup`]       |
//! | **Errors**      | Typed condition, timeout, and execution errors.                   | [`OperationError`]                            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogObserver`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use opvisor::{BlockOperation, NoCancelledDependencies, OperationQueue};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let queue = OperationQueue::new();
//!
//!     let fetch = BlockOperation::arc(|_op| async {
//!         println!("fetching");
//!         Ok(())
//!     });
//!
//!     // Runs only after `fetch`, and only if `fetch` was not cancelled.
//!     let parse = BlockOperation::arc(|_op| async {
//!         println!("parsing");
//!         Ok(())
//!     });
//!     parse.add_dependency(fetch.clone());
//!     parse.add_condition(NoCancelledDependencies);
//!
//!     queue.add_operations([fetch, parse]);
//!     queue.wait_idle().await;
//! }
//! ```

mod conditions;
mod core;
mod error;
mod observers;
mod operations;
mod sync;

// ---- Public re-exports ----

pub use conditions::{
    Condition, ConditionResult, MutuallyExclusive, NegatedCondition, NoCancelledDependencies,
    NoFailedDependencies, SilentCondition,
};
pub use core::{
    Execute, ExclusivityController, GroupOperation, Operation, OperationQueue, QueueBuilder,
    WorkerPool,
};
pub use error::OperationError;
pub use observers::{BlockObserver, Observer, TimeoutObserver};
pub use operations::{BlockOperation, DelayOperation};
pub use sync::CompletionGroup;

#[cfg(feature = "logging")]
pub use observers::LogObserver;
