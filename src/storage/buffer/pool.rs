// The transactional page cache.
//
// The pool is the single entry point operators use to reach pages. It owns
// the page map and the MRU order behind one monitor, and the lock manager
// and deadlock detector beside it. The monitor is never held across a page
// lock acquisition: blocking on a contended page while holding it would
// serialize the whole engine.

use std::collections::HashMap;
use std::process;
use std::sync::Arc;

use log::{debug, error};
use parking_lot::Mutex;

use super::error::BufferPoolError;
use super::replacer::MruTracker;
use crate::catalog::Catalog;
use crate::common::types::{PageId, Permission, TableId, DEFAULT_PAGES};
use crate::storage::heap::HeapFileError;
use crate::storage::page::HeapPage;
use crate::storage::tuple::Tuple;
use crate::transaction::concurrency::{DeadlockDetector, LockManager};
use crate::transaction::TransactionId;

/// Shared handle to one cached page.
pub type PagePtr = Arc<HeapPage>;

struct PoolInner {
    pages: HashMap<PageId, PagePtr>,
    mru: MruTracker,
}

pub struct BufferPool {
    max_pages: usize,
    catalog: Arc<Catalog>,
    inner: Mutex<PoolInner>,
    lock_manager: LockManager,
    detector: Arc<DeadlockDetector>,
}

impl BufferPool {
    /// Create a pool caching up to `max_pages` pages of the catalog's
    /// tables.
    pub fn new(max_pages: usize, catalog: Arc<Catalog>) -> Self {
        let detector = DeadlockDetector::start();
        Self {
            max_pages,
            catalog,
            inner: Mutex::new(PoolInner {
                pages: HashMap::new(),
                mru: MruTracker::new(max_pages),
            }),
            lock_manager: LockManager::new(detector.clone()),
            detector,
        }
    }

    pub fn with_default_capacity(catalog: Arc<Catalog>) -> Self {
        Self::new(DEFAULT_PAGES, catalog)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn detector(&self) -> &Arc<DeadlockDetector> {
        &self.detector
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Fetch a page on behalf of `tid` with the requested permission. A hit
    /// returns the cached page; a miss evicts if the pool is full and reads
    /// the page from its heap file. Either way the mode-appropriate lock is
    /// acquired after the pool monitor is released, so the caller may block
    /// without stalling other transactions.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> Result<PagePtr, BufferPoolError> {
        let page = {
            let mut inner = self.inner.lock();
            match inner.pages.get(&pid) {
                Some(page) => page.clone(),
                None => {
                    if inner.pages.len() == self.max_pages {
                        self.evict_page(&mut inner)?;
                    }
                    let file = self
                        .catalog
                        .file(pid.table_id)
                        .ok_or(BufferPoolError::UnknownTable(pid.table_id))?;
                    let page = Arc::new(file.read_page(pid, &self.detector)?);
                    inner.pages.insert(pid, page.clone());
                    inner.mru.add(pid);
                    page
                }
            }
        };
        self.lock_manager.grab_lock(tid, page.pg_lock(), perm)?;
        Ok(page)
    }

    /// Drop `tid`'s lock on one page before the transaction completes.
    /// Breaks two-phase locking; scans that give a read lock back early
    /// accept the risk, and the name is the warning.
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        let page = self.inner.lock().pages.get(&pid).cloned();
        if let Some(page) = page {
            self.lock_manager.unsafe_release(tid, page.pg_lock());
        }
    }

    /// Whether `tid` holds the lock of a cached page. False when the page is
    /// not in the pool.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let page = self.inner.lock().pages.get(&pid).cloned();
        match page {
            Some(page) => page.pg_lock().holds_lock(tid),
            None => false,
        }
    }

    /// Commit or abort `tid`, then release every lock it holds.
    ///
    /// Commit flushes the transaction's dirty pages synchronously (FORCE).
    /// Abort discards them, so the next access re-reads the last committed
    /// image from disk.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) {
        {
            let mut inner = self.inner.lock();
            if commit {
                if let Err(e) = self.flush_pages_locked(&mut inner, tid) {
                    // FORCE is broken: the committed image cannot be made
                    // durable, and without a log there is nothing to replay.
                    error!("commit-time flush failed for txn {}: {}", tid, e);
                    process::exit(1);
                }
            } else {
                let doomed: Vec<PageId> = inner
                    .pages
                    .iter()
                    .filter(|(_, page)| page.dirtier() == Some(tid))
                    .map(|(pid, _)| *pid)
                    .collect();
                for pid in doomed {
                    debug!("txn {} aborts, discarding page {}", tid, pid);
                    inner.mru.remove(&pid);
                    inner.pages.remove(&pid);
                }
            }
        }
        self.lock_manager.release_all(tid);
    }

    /// Insert a tuple into the table on behalf of `tid`, marking every
    /// dirtied page and keeping the cached copies current.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> Result<(), BufferPoolError> {
        let file = self
            .catalog
            .file(table_id)
            .ok_or(BufferPoolError::UnknownTable(table_id))?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.install_dirty(tid, dirtied);
        Ok(())
    }

    /// Delete a tuple from the page recorded in its record id, marking every
    /// dirtied page.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), BufferPoolError> {
        let rid = tuple
            .record_id()
            .ok_or(HeapFileError::TupleNotStored)
            .map_err(BufferPoolError::from)?;
        let file = self
            .catalog
            .file(rid.pid.table_id)
            .ok_or(BufferPoolError::UnknownTable(rid.pid.table_id))?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, dirtied);
        Ok(())
    }

    /// Flush every cached page to disk. Writes uncommitted data, so this
    /// breaks NO-STEAL; recovery and test use only.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        let pids: Vec<PageId> = inner.pages.keys().copied().collect();
        for pid in pids {
            self.flush_page_locked(&mut inner, pid)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without flushing it. Used to forget rolled
    /// back or deleted pages.
    pub fn remove_page(&self, pid: PageId) {
        let mut inner = self.inner.lock();
        inner.mru.remove(&pid);
        inner.pages.remove(&pid);
    }

    /// Write every page dirtied by `tid` to disk.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();
        self.flush_pages_locked(&mut inner, tid)
    }

    fn install_dirty(&self, tid: TransactionId, pages: Vec<PagePtr>) {
        let mut inner = self.inner.lock();
        for page in pages {
            page.mark_dirty(true, tid);
            let pid = page.pid();
            inner.mru.add(pid);
            inner.pages.insert(pid, page);
        }
    }

    fn flush_pages_locked(
        &self,
        inner: &mut PoolInner,
        tid: TransactionId,
    ) -> Result<(), BufferPoolError> {
        let dirty: Vec<PageId> = inner
            .pages
            .iter()
            .filter(|(_, page)| page.dirtier() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in dirty {
            self.flush_page_locked(inner, pid)?;
        }
        Ok(())
    }

    /// Write one page image to its heap file and mark it clean; a clean page
    /// is evictable again.
    fn flush_page_locked(
        &self,
        inner: &mut PoolInner,
        pid: PageId,
    ) -> Result<(), BufferPoolError> {
        let page = inner
            .pages
            .get(&pid)
            .ok_or(BufferPoolError::PageNotCached(pid))?;
        let file = self
            .catalog
            .file(pid.table_id)
            .ok_or(BufferPoolError::UnknownTable(pid.table_id))?;
        debug!("flushing page {}", pid);
        file.write_page(page)?;
        if let Some(dirtier) = page.dirtier() {
            page.mark_dirty(false, dirtier);
        }
        Ok(())
    }

    /// Pop MRU candidates until one is neither dirty nor locked (NO-STEAL:
    /// a page that could be in flight for a transaction is never evicted),
    /// flush it and drop it. Skipped candidates go back in their original
    /// order.
    fn evict_page(&self, inner: &mut PoolInner) -> Result<(), BufferPoolError> {
        let mut skipped: Vec<PageId> = Vec::new();
        let mut victim = None;
        while let Some(pid) = inner.mru.evict() {
            let Some(page) = inner.pages.get(&pid) else {
                continue;
            };
            if page.dirtier().is_some() || self.lock_manager.is_locked(page.pg_lock()) {
                skipped.push(pid);
            } else {
                victim = Some(pid);
                break;
            }
        }
        skipped.reverse();
        for pid in skipped {
            inner.mru.add(pid);
        }
        let Some(pid) = victim else {
            return Err(BufferPoolError::NothingToEvict);
        };
        // The victim is clean; under FORCE this rewrites the on-disk image.
        self.flush_page_locked(inner, pid)?;
        debug!("evicted page {}", pid);
        inner.pages.remove(&pid);
        Ok(())
    }
}
