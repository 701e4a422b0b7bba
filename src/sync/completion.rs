//! # Completion group: fan-in over a dynamic set of completions.
//!
//! [`CompletionGroup`] counts outstanding units of work: [`enter`] before a
//! unit starts, [`leave`] when it completes, [`wait`] until the count drops
//! to zero. New units may enter while someone is already waiting; the wait
//! resolves only once the count actually reaches zero.
//!
//! Built on a [`tokio::sync::watch`] channel so waiting never blocks a pool
//! thread: waiters are notified, not polled.
//!
//! [`enter`]: CompletionGroup::enter
//! [`leave`]: CompletionGroup::leave
//! [`wait`]: CompletionGroup::wait

use tokio::sync::watch;

/// Counted fan-in synchronization primitive.
///
/// Clones share the same counter; a group with zero outstanding entries is
/// idle and [`CompletionGroup::wait`] returns immediately.
#[derive(Clone, Debug)]
pub struct CompletionGroup {
    count: watch::Sender<usize>,
}

impl CompletionGroup {
    /// Creates an idle group.
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    /// Registers one outstanding unit of work.
    pub fn enter(&self) {
        self.count.send_modify(|n| *n += 1);
    }

    /// Marks one outstanding unit of work as complete.
    ///
    /// Unbalanced calls (more leaves than enters) are a programming error.
    pub fn leave(&self) {
        self.count.send_modify(|n| {
            debug_assert!(*n > 0, "CompletionGroup::leave without matching enter");
            *n = n.saturating_sub(1);
        });
    }

    /// Waits until the count of outstanding units reaches zero.
    ///
    /// Returns immediately when the group is already idle. Units entering
    /// while this waits extend the wait.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in self, so wait_for cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Whether there are currently no outstanding units.
    pub fn is_idle(&self) -> bool {
        *self.count.borrow() == 0
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_on_idle_group_returns_immediately() {
        let group = CompletionGroup::new();
        assert!(group.is_idle());
        group.wait().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_after_last_leave() {
        let group = CompletionGroup::new();
        group.enter();
        group.enter();
        assert!(!group.is_idle());

        let waiter = {
            let group = group.clone();
            tokio::spawn(async move { group.wait().await })
        };

        group.leave();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        group.leave();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve once the group drains")
            .unwrap();
        assert!(group.is_idle());
    }
}
