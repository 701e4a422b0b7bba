//! Leaf operation wrapping an async closure.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::core::{Execute, Operation};
use crate::error::OperationError;

/// An operation whose body is a one-shot async closure.
///
/// The closure receives the operation handle, so it can check cancellation
/// or produce further operations. Returning `Err` finishes the operation
/// with that error; returning `Ok(())` finishes it cleanly.
///
/// ```no_run
/// use opvisor::{BlockOperation, OperationQueue};
///
/// # async fn demo() {
/// let queue = OperationQueue::new();
/// queue.add_operation(BlockOperation::arc(|_op| async {
///     println!("hello");
///     Ok(())
/// }));
/// queue.wait_idle().await;
/// # }
/// ```
pub struct BlockOperation<F> {
    body: Mutex<Option<F>>,
}

impl<F, Fut> BlockOperation<F>
where
    F: FnOnce(Arc<Operation>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
{
    /// Wraps the closure into a ready-to-submit operation.
    pub fn arc(body: F) -> Arc<Operation> {
        Operation::new(Self {
            body: Mutex::new(Some(body)),
        })
    }
}

#[async_trait]
impl<F, Fut> Execute for BlockOperation<F>
where
    F: FnOnce(Arc<Operation>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
{
    async fn execute(&self, operation: &Arc<Operation>) {
        let body = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // The body runs at most once; a missing closure means the state
        // machine already guaranteed that, so just finish.
        match body {
            Some(body) => match body(Arc::clone(operation)).await {
                Ok(()) => operation.finish(),
                Err(error) => operation.finish_with([error]),
            },
            None => operation.finish(),
        }
    }
}
