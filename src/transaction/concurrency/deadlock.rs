// Wait-for-graph deadlock detection.
//
// A background thread wakes every INTERVAL and runs a detection pass, but
// only once the wait-for graph has been quiet for THRESHOLD. Lock traffic
// churns the graph far too quickly for per-edge cycle checks to pay off, so
// cycles are batched and broken together once the graph settles.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::Mutex;

use super::page_lock::{PageLock, WaitSignal};
use crate::transaction::TransactionId;

/// How often the background sweep thread wakes.
pub const INTERVAL: Duration = Duration::from_millis(10);

/// How long the wait-for graph must stay unchanged before a pass runs.
pub const THRESHOLD: Duration = Duration::from_millis(100);

/// Detects wait-for cycles among blocked transactions and aborts the
/// youngest member of each cycle (WOUND-WAIT). The oldest transaction is
/// never chosen, which guarantees system-wide progress.
pub struct DeadlockDetector {
    inner: Mutex<DetectorInner>,
}

struct DetectorInner {
    /// Locks each blocked transaction currently waits for.
    wait_map: HashMap<TransactionId, HashSet<Arc<PageLock>>>,
    /// Abort token of each blocked transaction. An entry exists only while
    /// the transaction sleeps inside a lock acquisition, so a victim that is
    /// no longer blocked is never disturbed.
    token_map: HashMap<TransactionId, Arc<WaitSignal>>,
    last_update: Instant,
    last_check: Instant,
}

impl DeadlockDetector {
    /// Create the detector and kick off its sweep thread. The thread holds
    /// only a weak handle and exits once the last owner drops the detector.
    pub fn start() -> Arc<Self> {
        let now = Instant::now();
        let detector = Arc::new(Self {
            inner: Mutex::new(DetectorInner {
                wait_map: HashMap::new(),
                token_map: HashMap::new(),
                last_update: now,
                last_check: now,
            }),
        });
        let weak = Arc::downgrade(&detector);
        thread::Builder::new()
            .name("deadlock-detector".into())
            .spawn(move || loop {
                thread::sleep(INTERVAL);
                match weak.upgrade() {
                    Some(detector) => detector.sweep(),
                    None => break,
                }
            })
            .expect("failed to spawn deadlock detector thread");
        detector
    }

    /// Record that `tid` blocks on `lock` and register its abort token.
    pub(crate) fn wait_for(
        &self,
        tid: TransactionId,
        lock: Arc<PageLock>,
        token: Arc<WaitSignal>,
    ) {
        let mut inner = self.inner.lock();
        inner.last_update = Instant::now();
        inner.token_map.insert(tid, token);
        inner.wait_map.entry(tid).or_default().insert(lock);
    }

    /// Remove the tid -> lock wait edge; no-op when absent. The abort token
    /// goes away with the last edge.
    pub(crate) fn unwait(&self, tid: TransactionId, lock: &PageLock) {
        let mut inner = self.inner.lock();
        inner.last_update = Instant::now();
        if let Some(locks) = inner.wait_map.get_mut(&tid) {
            locks.remove(lock);
            if locks.is_empty() {
                inner.wait_map.remove(&tid);
                inner.token_map.remove(&tid);
            }
        }
    }

    /// Forget every trace of `tid`. Called when its transaction completes.
    pub fn unwait_all(&self, tid: TransactionId) {
        let mut inner = self.inner.lock();
        inner.last_update = Instant::now();
        inner.wait_map.remove(&tid);
        inner.token_map.remove(&tid);
    }

    /// One detection pass. Skips unless the graph has been quiet for
    /// THRESHOLD and the previous pass is at least THRESHOLD old. Because
    /// every edge mutation takes the same mutex this pass holds, the graph
    /// it walks is a consistent point-in-time snapshot.
    fn sweep(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        if now.duration_since(inner.last_update) < THRESHOLD
            || now.duration_since(inner.last_check) < THRESHOLD
        {
            return;
        }

        let mut to_abort: HashSet<TransactionId> = HashSet::new();
        let mut seen: HashSet<TransactionId> = HashSet::new();
        let roots: Vec<TransactionId> = inner.wait_map.keys().copied().collect();

        // Brute-force all-simple-cycle search: DFS from every unvisited
        // root, recording each path that closes back on its start.
        for root in roots {
            if seen.contains(&root) {
                continue;
            }
            seen.insert(root);
            let mut path = vec![root];
            let mut cycles: HashSet<BTreeSet<TransactionId>> = HashSet::new();
            Self::dfs(&inner, root, &seen, &mut path, &mut cycles);

            // WOUND-WAIT: condemn the youngest member of each cycle.
            for cycle in cycles {
                if let Some(victim) = cycle.iter().max().copied() {
                    to_abort.insert(victim);
                }
            }

            // Everything except the oldest already condemned, stop early.
            if to_abort.len() == inner.token_map.len().saturating_sub(1) {
                break;
            }
        }

        if !to_abort.is_empty() {
            info!("aborting {} deadlocked transaction(s)", to_abort.len());
        }
        for tid in to_abort {
            // Trip the abort token only if the victim is still blocked inside
            // a lock acquisition; a transaction mid-flight elsewhere is left
            // alone and a later pass will reconsider it.
            if let Some(token) = inner.token_map.remove(&tid) {
                debug!("deadlock victim: txn {}", tid);
                token.abort();
            }
        }
        inner.last_check = Instant::now();
    }

    /// Depth-first search for simple cycles that close back on `path[0]`.
    fn dfs(
        inner: &DetectorInner,
        node: TransactionId,
        seen: &HashSet<TransactionId>,
        path: &mut Vec<TransactionId>,
        cycles: &mut HashSet<BTreeSet<TransactionId>>,
    ) {
        let Some(locks) = inner.wait_map.get(&node) else {
            return;
        };
        for lock in locks {
            for child in lock.holders() {
                if child == node {
                    // Re-entrant hold, not a deadlock.
                    continue;
                }
                if path.first() == Some(&child) && path.len() > 1 {
                    cycles.insert(path.iter().copied().collect());
                    continue;
                }
                if !path.contains(&child) && !seen.contains(&child) {
                    path.push(child);
                    Self::dfs(inner, child, seen, path, cycles);
                    path.pop();
                }
            }
        }
    }
}
