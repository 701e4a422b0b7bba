//! # Timeout observer.
//!
//! Attach-and-forget: when the observed operation starts, a timer is armed;
//! if the operation has not finished when it fires, the operation is
//! cancelled with [`OperationError::Timeout`]. This is built atop
//! cancellation, not preemption: a running body still has to poll
//! [`Operation::is_cancelled`](crate::Operation::is_cancelled) to stop
//! early.

use std::sync::Arc;
use std::time::Duration;

use crate::core::Operation;
use crate::observers::Observer;
use crate::OperationError;

/// Cancels the observed operation if it runs longer than `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutObserver {
    timeout: Duration,
}

impl TimeoutObserver {
    /// Creates a timeout observer with the given duration.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Observer for TimeoutObserver {
    fn on_start(&self, operation: &Arc<Operation>) {
        let timeout = self.timeout;
        let operation = Arc::clone(operation);
        tokio::spawn(async move {
            tokio::select! {
                // Finished in time; drop the timer (and our handle).
                _ = operation.wait() => {}
                _ = tokio::time::sleep(timeout) => {
                    operation.cancel_with([OperationError::Timeout { timeout }]);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkerPool;
    use crate::operations::{BlockOperation, DelayOperation};

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_is_cancelled_with_timeout_error() {
        let pool = WorkerPool::new();
        let timeout = Duration::from_millis(100);

        let op = DelayOperation::arc(Duration::from_secs(60));
        op.add_observer(TimeoutObserver::new(timeout));
        op.enqueue(&pool, None);
        op.wait().await;

        assert!(op.is_cancelled());
        assert_eq!(op.errors(), [OperationError::Timeout { timeout }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_is_untouched() {
        let pool = WorkerPool::new();

        let op = BlockOperation::arc(|_op| async { Ok(()) });
        op.add_observer(TimeoutObserver::new(Duration::from_millis(100)));
        op.enqueue(&pool, None);
        op.wait().await;

        assert!(!op.is_cancelled());
        assert!(op.errors().is_empty());
    }
}
