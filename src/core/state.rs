//! # Operation lifecycle states.
//!
//! States advance under a strict total order:
//!
//! ```text
//! Created → Enqueued → WaitingForDependencies → EvaluatingConditions
//!         → Running → Finishing{cancelled} → Finished{cancelled}
//! ```
//!
//! Forward transitions are compared by [`State::rank`]; a transition to a
//! lower or equal rank is a programming error. Cancellation is orthogonal:
//! it is carried as a flag on the two terminal variants and may be reached
//! from any earlier state, skipping the remaining forward states.

use std::fmt;

/// Lifecycle state of an [`Operation`](crate::Operation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Created but not yet added to a queue.
    Created,
    /// Handed to a worker pool; the run sequence has not started yet.
    Enqueued,
    /// Waiting for every dependency to reach `Finished`.
    WaitingForDependencies,
    /// Dependencies done; conditions are being evaluated concurrently.
    EvaluatingConditions,
    /// The operation body is executing.
    Running,
    /// Finish has begun: the cancel/finish hooks run before the terminal
    /// state is published. First finish call wins this gate.
    Finishing { cancelled: bool },
    /// Terminal. Observers have been handed the `(cancelled, errors)` outcome.
    Finished { cancelled: bool },
}

impl State {
    /// Position of this state in the total order.
    pub(crate) fn rank(self) -> u8 {
        match self {
            State::Created => 1,
            State::Enqueued => 2,
            State::WaitingForDependencies => 3,
            State::EvaluatingConditions => 4,
            State::Running => 5,
            State::Finishing { .. } => 6,
            State::Finished { .. } => 7,
        }
    }

    /// Whether this operation has reached the terminal state (cancelled or not).
    pub(crate) fn is_finished(self) -> bool {
        matches!(self, State::Finished { .. })
    }

    /// Whether finish processing has at least begun.
    pub(crate) fn is_concluding(self) -> bool {
        self.rank() >= State::Finishing { cancelled: false }.rank()
    }

    /// Whether the operation was cancelled.
    pub(crate) fn is_cancelled(self) -> bool {
        matches!(
            self,
            State::Finishing { cancelled: true } | State::Finished { cancelled: true }
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            State::Created => "created",
            State::Enqueued => "enqueued",
            State::WaitingForDependencies => "waiting for dependencies",
            State::EvaluatingConditions => "evaluating conditions",
            State::Running => "running",
            State::Finishing { cancelled: true } => "cancelling",
            State::Finishing { cancelled: false } => "finishing",
            State::Finished { cancelled: true } => "cancelled",
            State::Finished { cancelled: false } => "finished",
        };
        f.write_str(text)
    }
}
