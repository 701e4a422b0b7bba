//! # Synchronized cell.
//!
//! [`SyncCell`] wraps a value behind a mutex and exposes three access shapes:
//! - [`SyncCell::read`]: clone a snapshot under the lock;
//! - [`SyncCell::with`]: run a closure against `&mut V` under the lock;
//! - [`SyncCell::coordinated`]: run a closure against two cells at once.
//!
//! ## Rules
//! - Callbacks run while the lock is held; they must not call back into the
//!   same cell. Reentrant access is a programming error and is detected in
//!   debug builds (owner-thread check).
//! - `coordinated` acquires the two locks in address order, so two threads
//!   coordinating the same pair from opposite sides cannot deadlock.
//! - Coordinating a cell with itself is a programming error.

#[cfg(debug_assertions)]
use std::collections::hash_map::DefaultHasher;
#[cfg(debug_assertions)]
use std::hash::{Hash, Hasher};
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Hashes the current thread id into a non-zero u64.
#[cfg(debug_assertions)]
fn current_thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish() | 1
}

/// Clears the recorded owner thread when the lock is released.
#[cfg(debug_assertions)]
struct OwnerReset<'a>(&'a AtomicU64);

#[cfg(debug_assertions)]
impl Drop for OwnerReset<'_> {
    fn drop(&mut self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Mutual-exclusion wrapper for a value. All access to the stored value is
/// synchronized.
#[derive(Debug, Default)]
pub struct SyncCell<V> {
    value: Mutex<V>,
    #[cfg(debug_assertions)]
    owner: AtomicU64,
}

impl<V> SyncCell<V> {
    /// Creates a new cell holding `value`.
    pub fn new(value: V) -> Self {
        Self {
            value: Mutex::new(value),
            #[cfg(debug_assertions)]
            owner: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, V> {
        #[cfg(debug_assertions)]
        debug_assert_ne!(
            self.owner.load(Ordering::Relaxed),
            current_thread_id(),
            "reentrant SyncCell access from inside a callback"
        );
        let guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        #[cfg(debug_assertions)]
        self.owner.store(current_thread_id(), Ordering::Relaxed);
        guard
    }

    /// Returns a snapshot of the value, taken under the lock.
    pub fn read(&self) -> V
    where
        V: Clone,
    {
        self.with(|v| v.clone())
    }

    /// Runs `work` with exclusive access to the value and returns its result.
    pub fn with<T>(&self, work: impl FnOnce(&mut V) -> T) -> T {
        let mut guard = self.lock();
        #[cfg(debug_assertions)]
        let _reset = OwnerReset(&self.owner);
        work(&mut guard)
    }

    /// Runs `work` with exclusive access to this cell's value *and* another
    /// cell's value under both locks.
    ///
    /// Locks are acquired in address order; concurrent `a.coordinated(b)` and
    /// `b.coordinated(a)` therefore agree on acquisition order and cannot
    /// deadlock each other.
    pub fn coordinated<O, T>(&self, other: &SyncCell<O>, work: impl FnOnce(&mut V, &mut O) -> T) -> T {
        let self_addr = self as *const Self as usize;
        let other_addr = other as *const SyncCell<O> as usize;
        debug_assert_ne!(self_addr, other_addr, "cannot coordinate a SyncCell with itself");

        let mut mine;
        let mut theirs;
        if self_addr < other_addr {
            mine = self.lock();
            theirs = other.lock();
        } else {
            theirs = other.lock();
            mine = self.lock();
        }
        #[cfg(debug_assertions)]
        let _resets = (OwnerReset(&self.owner), OwnerReset(&other.owner));
        work(&mut mine, &mut theirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_read_and_with() {
        let cell = SyncCell::new(1);
        assert_eq!(cell.read(), 1);
        let doubled = cell.with(|v| {
            *v += 1;
            *v * 2
        });
        assert_eq!(doubled, 4);
        assert_eq!(cell.read(), 2);
    }

    #[test]
    fn test_coordinated_sees_both_values() {
        let a = SyncCell::new(vec![1, 2]);
        let b = SyncCell::new(0usize);
        a.coordinated(&b, |deps, count| {
            deps.push(3);
            *count = deps.len();
        });
        assert_eq!(a.read(), vec![1, 2, 3]);
        assert_eq!(b.read(), 3);
    }

    #[test]
    fn test_coordinated_opposite_orders_do_not_deadlock() {
        let a = Arc::new(SyncCell::new(0u64));
        let b = Arc::new(SyncCell::new(0u64));

        let handles: Vec<_> = (0..2)
            .map(|side| {
                let a = Arc::clone(&a);
                let b = Arc::clone(&b);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        if side == 0 {
                            a.coordinated(&b, |x, y| {
                                *x += 1;
                                *y += 1;
                            });
                        } else {
                            b.coordinated(&a, |y, x| {
                                *x += 1;
                                *y += 1;
                            });
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(a.read(), 20_000);
        assert_eq!(b.read(), 20_000);
    }

    #[test]
    #[should_panic(expected = "reentrant SyncCell access")]
    fn test_reentrant_access_is_detected() {
        let cell = SyncCell::new(0);
        cell.with(|_| {
            let _ = cell.read();
        });
    }
}
