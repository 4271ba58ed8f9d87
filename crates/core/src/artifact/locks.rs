//! Per-item async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes asset mutations of a single item. Entries are dropped once
/// nobody holds or waits for them, including waiters whose future was
/// dropped before the lock was granted.
#[derive(Debug, Default)]
pub struct ItemLocks {
    locks: Mutex<HashMap<i64, Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: i64) -> ItemGuard<'_> {
        let (lock, registration) = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = locks.entry(id).or_default();
            slot.users += 1;
            (
                Arc::clone(&slot.lock),
                Registration { locks: self, id },
            )
        };
        let guard = lock.lock_owned().await;
        ItemGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of items with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One holder's or waiter's claim on a map entry.
struct Registration<'a> {
    locks: &'a ItemLocks,
    id: i64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = locks.get_mut(&self.id) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                locks.remove(&self.id);
            }
        }
    }
}

/// Held while an item's assets are being changed. Fields drop in order, so
/// the lock is released before the entry is deregistered.
pub struct ItemGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}
