//! # Closure-backed observer.
//!
//! [`BlockObserver`] implements [`Observer`] by running a closure for each
//! hook. Build one from a single hook and chain further hooks as needed:
//!
//! ```
//! use opvisor::BlockObserver;
//!
//! let observer = BlockObserver::on_start(|op| println!("started {op:?}"))
//!     .with_finish(|_op, cancelled, errors| {
//!         println!("finished cancelled={cancelled} errors={}", errors.len());
//!     });
//! # let _ = observer;
//! ```

use std::sync::Arc;

use crate::core::Operation;
use crate::error::OperationError;
use crate::observers::Observer;

type StartFn = Box<dyn Fn(&Arc<Operation>) + Send + Sync>;
type ProduceFn = Box<dyn Fn(&Arc<Operation>, &Arc<Operation>) + Send + Sync>;
type FinishFn = Box<dyn Fn(&Arc<Operation>, bool, &[OperationError]) + Send + Sync>;

/// An [`Observer`] that executes a closure for each hook it was given.
#[derive(Default)]
pub struct BlockObserver {
    start: Option<StartFn>,
    produce: Option<ProduceFn>,
    finish: Option<FinishFn>,
}

impl BlockObserver {
    /// Creates an observer with only a start hook.
    pub fn on_start(f: impl Fn(&Arc<Operation>) + Send + Sync + 'static) -> Self {
        Self::default().with_start(f)
    }

    /// Creates an observer with only a produce hook.
    pub fn on_produce(
        f: impl Fn(&Arc<Operation>, &Arc<Operation>) + Send + Sync + 'static,
    ) -> Self {
        Self::default().with_produce(f)
    }

    /// Creates an observer with only a finish hook.
    pub fn on_finish(
        f: impl Fn(&Arc<Operation>, bool, &[OperationError]) + Send + Sync + 'static,
    ) -> Self {
        Self::default().with_finish(f)
    }

    /// Sets the start hook.
    pub fn with_start(mut self, f: impl Fn(&Arc<Operation>) + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    /// Sets the produce hook.
    pub fn with_produce(
        mut self,
        f: impl Fn(&Arc<Operation>, &Arc<Operation>) + Send + Sync + 'static,
    ) -> Self {
        self.produce = Some(Box::new(f));
        self
    }

    /// Sets the finish hook.
    pub fn with_finish(
        mut self,
        f: impl Fn(&Arc<Operation>, bool, &[OperationError]) + Send + Sync + 'static,
    ) -> Self {
        self.finish = Some(Box::new(f));
        self
    }
}

impl Observer for BlockObserver {
    fn on_start(&self, operation: &Arc<Operation>) {
        if let Some(f) = &self.start {
            f(operation);
        }
    }

    fn on_produce(&self, operation: &Arc<Operation>, produced: &Arc<Operation>) {
        if let Some(f) = &self.produce {
            f(operation, produced);
        }
    }

    fn on_finish(&self, operation: &Arc<Operation>, cancelled: bool, errors: &[OperationError]) {
        if let Some(f) = &self.finish {
            f(operation, cancelled, errors);
        }
    }
}
