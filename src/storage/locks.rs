//! Per-user critical sections
//!
//! Used where a backend has no single atomic primitive for an operation and
//! has to "check, then create" on behalf of one user. An entry lives only
//! while some caller holds or waits on it, so the table stays as small as
//! the number of users with an operation in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};

/// A mutex per user key, created on first use and dropped when idle
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `user_key`
    pub fn with_lock<R>(&self, user_key: &str, f: impl FnOnce() -> StoreResult<R>) -> StoreResult<R> {
        let handle = self.handle(user_key)?;

        let result = match acquire(&handle) {
            Ok(_guard) => f(),
            Err(e) => Err(e),
        };

        self.release(user_key, handle);
        result
    }

    /// Number of users that have a lock entry
    pub fn len(&self) -> usize {
        self.table().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>>> {
        self.locks
            .lock()
            .map_err(|e| StoreError::StorageUnavailable(format!("Failed to acquire lock table: {}", e)))
    }

    fn handle(&self, user_key: &str) -> StoreResult<Arc<Mutex<()>>> {
        let mut locks = self.table()?;

        Ok(Arc::clone(
            locks
                .entry(user_key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Drop `handle` and forget the entry if no one else holds it
    ///
    /// Checked under the table lock, so a concurrent `handle` either sees the
    /// old entry (and keeps it alive) or creates a fresh one.
    fn release(&self, user_key: &str, handle: Arc<Mutex<()>>) {
        drop(handle);

        if let Ok(mut locks) = self.table() {
            if locks
                .get(user_key)
                .is_some_and(|l| Arc::strong_count(l) == 1)
            {
                locks.remove(user_key);
            }
        }
    }
}

fn acquire(handle: &Mutex<()>) -> StoreResult<MutexGuard<'_, ()>> {
    handle
        .lock()
        .map_err(|e| StoreError::StorageUnavailable(format!("Failed to acquire user lock: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_user_shares_handle() {
        let locks = UserLocks::new();
        let a = locks.handle("1").unwrap();
        let b = locks.handle("1").unwrap();
        let c = locks.handle("2").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_entry_removed_after_use() {
        let locks = UserLocks::new();
        for user in 0..100 {
            let value = locks.with_lock(&user.to_string(), || Ok(user * 2)).unwrap();
            assert_eq!(value, user * 2);
        }
        assert!(locks.is_empty());
    }

    #[test]
    fn test_entry_removed_after_error() {
        let locks = UserLocks::new();
        let err = locks
            .with_lock("9", || -> StoreResult<()> { Err(StoreError::Validation("no".into())) })
            .unwrap_err();
        assert!(err.is_validation());
        assert!(locks.is_empty());
    }

    #[test]
    fn test_entry_kept_while_held_elsewhere() {
        let locks = UserLocks::new();
        let held = locks.handle("5").unwrap();

        locks.with_lock("5", || Ok(())).unwrap();
        assert_eq!(locks.len(), 1);

        locks.release("5", held);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_critical_section_is_exclusive() {
        let locks = Arc::new(UserLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks
                        .with_lock("42", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(2));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
