//! Leaf operation that finishes after a delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::core::{Execute, Operation};

/// An operation that waits out a delay and then finishes, without blocking
/// a pool thread.
///
/// Useful as a dependency to postpone other operations. Cancelling it ends
/// the wait immediately.
pub struct DelayOperation {
    delay: Delay,
}

enum Delay {
    Interval(Duration),
    Until(Instant),
}

impl Delay {
    fn remaining(&self) -> Duration {
        match self {
            Delay::Interval(interval) => *interval,
            Delay::Until(deadline) => deadline.saturating_duration_since(Instant::now()),
        }
    }
}

impl DelayOperation {
    /// An operation finishing `delay` after it starts executing.
    pub fn arc(delay: Duration) -> Arc<Operation> {
        Operation::new(Self {
            delay: Delay::Interval(delay),
        })
    }

    /// An operation finishing at `deadline`. A deadline already in the past
    /// finishes immediately.
    pub fn until(deadline: Instant) -> Arc<Operation> {
        Operation::new(Self {
            delay: Delay::Until(deadline),
        })
    }
}

#[async_trait]
impl Execute for DelayOperation {
    async fn execute(&self, operation: &Arc<Operation>) {
        let remaining = self.delay.remaining();
        if remaining.is_zero() {
            operation.finish();
            return;
        }
        tokio::select! {
            // Cancellation cuts the delay short; the state machine already
            // concluded the operation.
            _ = operation.wait() => {}
            _ = tokio::time::sleep(remaining) => operation.finish(),
        }
    }
}
