//! # Worker pool: a suspend/resume gated spawner over a tokio runtime.
//!
//! The scheduling core only requires "submit a callable to run
//! concurrently"; [`WorkerPool`] provides that over a captured
//! [`tokio::runtime::Handle`], plus a gate that lets the owning queue defer
//! dispatch while suspended.
//!
//! ## Rules
//! - [`dispatch`] honors the gate: work submitted while suspended starts
//!   only after [`resume`]. Work already running is never interrupted.
//! - [`spawn`] bypasses the gate; the queue uses it for its own bookkeeping
//!   so a suspended queue still settles finished operations.
//! - Both work from any thread: the runtime handle is captured at pool
//!   construction.
//!
//! [`dispatch`]: WorkerPool::dispatch
//! [`spawn`]: WorkerPool::spawn
//! [`resume`]: WorkerPool::resume

use std::future::Future;
use std::sync::{Arc, OnceLock, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::core::queue::{OperationQueue, CURRENT_QUEUE};

#[derive(Debug)]
struct PoolInner {
    handle: Handle,
    /// Dispatch gate: `true` while the pool accepts new execution.
    gate: watch::Sender<bool>,
    /// Owning queue, made visible to dispatched work via a task-local.
    queue: OnceLock<Weak<OperationQueue>>,
}

/// Handle to the worker pool executing operations for one queue.
///
/// Cheap to clone; clones share the gate and the runtime handle.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates a pool over the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime context.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Creates a pool over an explicit runtime handle.
    pub fn with_handle(handle: Handle) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(PoolInner {
                handle,
                gate,
                queue: OnceLock::new(),
            }),
        }
    }

    /// Associates the pool with its owning queue. Set once, at queue
    /// construction.
    pub(crate) fn bind(&self, queue: &Arc<OperationQueue>) {
        let _ = self.inner.queue.set(Arc::downgrade(queue));
    }

    /// Submits operation work, deferred while the pool is suspended.
    ///
    /// The future runs with the owning queue installed as the task-local
    /// current queue, so nested [`OperationQueue::current`] lookups resolve.
    pub fn dispatch<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut gate = self.inner.gate.subscribe();
        let work = async move {
            // Err means the pool was torn down while suspended; the work is
            // dropped with it.
            if gate.wait_for(|open| *open).await.is_err() {
                return;
            }
            future.await;
        };
        match self.inner.queue.get() {
            Some(queue) => {
                self.inner
                    .handle
                    .spawn(CURRENT_QUEUE.scope(queue.clone(), work));
            }
            None => {
                self.inner.handle.spawn(work);
            }
        }
    }

    /// Submits bookkeeping work immediately, ignoring the suspend gate.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.handle.spawn(future);
    }

    /// Stops accepting new execution. In-flight work is unaffected.
    pub fn suspend(&self) {
        self.inner.gate.send_replace(false);
    }

    /// Resumes execution of deferred and future work.
    pub fn resume(&self) {
        self.inner.gate.send_replace(true);
    }

    /// Whether the pool currently defers new execution.
    pub fn is_suspended(&self) -> bool {
        !*self.inner.gate.borrow()
    }
}
