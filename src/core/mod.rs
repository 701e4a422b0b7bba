//! Scheduling core: operations, queues, the worker pool, and the
//! mutual-exclusion controller.

mod exclusivity;
mod group;
mod operation;
mod pool;
mod queue;
mod state;

pub use exclusivity::ExclusivityController;
pub use group::GroupOperation;
pub use operation::{Execute, Operation};
pub use pool::WorkerPool;
pub use queue::{OperationQueue, QueueBuilder};
