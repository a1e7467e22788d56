use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db_types::OrderCode;

/// A set of per-order mutexes.
///
/// Every read-decide-write sequence on an order runs while holding that order's lock, so two webhooks for the same
/// order are applied one after the other. Work on different orders proceeds in parallel. Entries are dropped once
/// nobody holds or waits on them, so the map only ever contains orders that are currently busy.
#[derive(Debug, Clone, Default)]
pub struct OrderLocks {
    locks: Arc<DashMap<OrderCode, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the lock for `code` is free and takes it. The lock is released when the guard is dropped.
    pub async fn lock(&self, code: OrderCode) -> OrderLockGuard {
        let mutex = self.locks.entry(code).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        OrderLockGuard { code, locks: self.clone(), guard: Some(guard) }
    }

    /// The number of orders that are currently locked or being waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct OrderLockGuard {
    code: OrderCode,
    locks: OrderLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OrderLockGuard {
    pub fn order_code(&self) -> OrderCode {
        self.code
    }
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        // The guard holds a reference to the mutex, so release it before checking whether anyone else still does.
        self.guard.take();
        self.locks.locks.remove_if(&self.code, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
