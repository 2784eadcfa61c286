// Bookkeeping of the page locks each transaction holds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::deadlock::DeadlockDetector;
use super::page_lock::PageLock;
use crate::common::types::Permission;
use crate::transaction::{Aborted, TransactionId};

/// Tracks the set of page locks every live transaction holds. The map is
/// shared; each per-transaction set is only ever touched by the owning
/// transaction's thread, except during transaction teardown, which assumes
/// the transaction is not concurrently acquiring.
pub struct LockManager {
    detector: Arc<DeadlockDetector>,
    lock_map: Mutex<HashMap<TransactionId, HashSet<Arc<PageLock>>>>,
}

impl LockManager {
    pub fn new(detector: Arc<DeadlockDetector>) -> Self {
        Self {
            detector,
            lock_map: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the mode matching `perm` on the page's lock for `tid`, then
    /// record the lock under the transaction.
    pub fn grab_lock(
        &self,
        tid: TransactionId,
        lock: &Arc<PageLock>,
        perm: Permission,
    ) -> Result<(), Aborted> {
        match perm {
            Permission::ReadOnly => lock.s_lock(tid)?,
            Permission::ReadWrite => lock.x_lock(tid)?,
        }
        self.lock_map.lock().entry(tid).or_default().insert(lock.clone());
        Ok(())
    }

    /// Drop `tid`'s hold on one page ahead of commit. Callers accept the
    /// two-phase-locking violation; the name is the warning.
    pub fn unsafe_release(&self, tid: TransactionId, lock: &Arc<PageLock>) {
        self.detector.unwait(tid, lock);
        lock.release_all(tid);
        if let Some(locks) = self.lock_map.lock().get_mut(&tid) {
            locks.remove(lock.as_ref());
        }
    }

    /// Release every lock `tid` holds and forget the transaction.
    pub fn release_all(&self, tid: TransactionId) {
        self.detector.unwait_all(tid);
        let locks = self.lock_map.lock().remove(&tid);
        if let Some(locks) = locks {
            for lock in locks {
                lock.release_all(tid);
            }
        }
    }

    /// Whether any transaction currently holds the page's lock. Eviction
    /// uses this to enforce NO-STEAL.
    pub fn is_locked(&self, lock: &PageLock) -> bool {
        !lock.holders().is_empty()
    }
}
