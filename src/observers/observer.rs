//! # Observer contract.
//!
//! Observers are passive listeners for an operation's lifecycle events.
//! All three hooks are fire-and-forget notifications; no return value
//! influences scheduling. Notifications iterate a snapshot of the
//! operation's observer list taken under its own synchronization, so the
//! list may be mutated concurrently with dispatch.

use std::sync::Arc;

use crate::core::Operation;
use crate::error::OperationError;

/// A passive listener for an operation's start/produce/finish events.
///
/// Hooks run on whichever thread drives the operation at that moment; keep
/// them short and non-blocking, or hand the work to a spawned task.
pub trait Observer: Send + Sync + 'static {
    /// Invoked immediately before the operation's body executes.
    fn on_start(&self, operation: &Arc<Operation>) {
        let _ = operation;
    }

    /// Invoked when the operation spawns `produced` mid-execution via
    /// [`Operation::produce`].
    fn on_produce(&self, operation: &Arc<Operation>, produced: &Arc<Operation>) {
        let _ = (operation, produced);
    }

    /// Invoked exactly once when the operation finishes, with whether it
    /// was cancelled and the errors it aggregated.
    fn on_finish(&self, operation: &Arc<Operation>, cancelled: bool, errors: &[OperationError]) {
        let _ = (operation, cancelled, errors);
    }
}
