// Page-granular shared/exclusive logical lock.
//
// Locks are held by transactions, not threads, although each transaction is
// assumed to run on exactly one thread. Shared requests are woken in batches
// while exclusive requests win a one-at-a-time lottery from a FIFO queue,
// which keeps readers flowing without stampeding the queue on every release.

use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::{Condvar, Mutex};

use super::deadlock::DeadlockDetector;
use crate::common::types::PageId;
use crate::transaction::{Aborted, TransactionId};

/// Outcome of one sleep on a wait ticket.
enum Wake {
    Retry,
    Aborted,
}

/// Condition handle a blocked request sleeps on. The deadlock detector holds
/// a clone as the abort token of the waiting transaction: tripping it turns
/// the pending acquisition into an `Aborted` error.
pub(crate) struct WaitSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

#[derive(Default)]
struct SignalState {
    woken: bool,
    aborted: bool,
}

impl WaitSignal {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SignalState::default()),
            cond: Condvar::new(),
        })
    }

    /// Block until the lottery wakes this ticket or the abort token trips.
    /// A wakeup is consumed by the caller; an abort is sticky.
    fn wait(&self) -> Wake {
        let mut st = self.state.lock();
        while !st.woken && !st.aborted {
            self.cond.wait(&mut st);
        }
        if st.aborted {
            Wake::Aborted
        } else {
            st.woken = false;
            Wake::Retry
        }
    }

    fn wake(&self) {
        let mut st = self.state.lock();
        st.woken = true;
        self.cond.notify_all();
    }

    /// Trip the abort token. Called by the deadlock detector on a victim.
    pub(crate) fn abort(&self) {
        let mut st = self.state.lock();
        st.aborted = true;
        self.cond.notify_all();
    }
}

/// Waiter record binding a transaction to the signal it sleeps on. Lives
/// only while the transaction blocks on this lock.
#[derive(Clone)]
struct Ticket {
    tid: TransactionId,
    signal: Arc<WaitSignal>,
}

impl Ticket {
    fn new(tid: TransactionId) -> Self {
        Self {
            tid,
            signal: WaitSignal::new(),
        }
    }

    fn is(&self, other: &Ticket) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Shared,
    Exclusive,
}

#[derive(Default)]
struct LockState {
    x_holder: Option<TransactionId>,
    s_holders: HashSet<TransactionId>,
    s_pool: Vec<Ticket>,
    x_queue: VecDeque<Ticket>,
}

impl LockState {
    /// Grant table for shared requests. A transaction already holding the
    /// exclusive lock is granted S without a downgrade.
    fn try_s_lock(&mut self, tid: TransactionId) -> bool {
        if self.s_holders.contains(&tid) {
            return true;
        }
        match self.x_holder {
            None => {
                self.s_holders.insert(tid);
                true
            }
            Some(x) if x == tid => {
                self.s_holders.insert(tid);
                true
            }
            Some(_) => false,
        }
    }

    /// Grant table for exclusive requests. The sole S-holder upgrades in
    /// place; no other upgrade is supported.
    fn try_x_lock(&mut self, tid: TransactionId) -> bool {
        if self.x_holder == Some(tid) {
            return true;
        }
        let sole_s = self.s_holders.is_empty()
            || (self.s_holders.len() == 1 && self.s_holders.contains(&tid));
        if self.x_holder.is_none() && sole_s {
            self.x_holder = Some(tid);
            return true;
        }
        false
    }

    fn try_grant(&mut self, tid: TransactionId, mode: Mode) -> bool {
        match mode {
            Mode::Shared => self.try_s_lock(tid),
            Mode::Exclusive => self.try_x_lock(tid),
        }
    }

    fn enqueue(&mut self, ticket: Ticket, mode: Mode) {
        match mode {
            Mode::Shared => self.s_pool.push(ticket),
            Mode::Exclusive => self.x_queue.push_back(ticket),
        }
    }

    fn dequeue(&mut self, ticket: &Ticket, mode: Mode) {
        match mode {
            Mode::Shared => self.s_pool.retain(|t| !t.is(ticket)),
            Mode::Exclusive => self.x_queue.retain(|t| !t.is(ticket)),
        }
    }

    /// Wakeup policy after any release. While the lock stays X-held nothing
    /// happens. Otherwise every shared waiter is woken at once; only if no
    /// reader waits does the head of the exclusive queue get its turn. A
    /// steady stream of readers can starve exclusive waiters.
    fn run_lottery(&mut self) {
        if self.x_holder.is_some() {
            return;
        }
        if !self.s_pool.is_empty() {
            for ticket in self.s_pool.drain(..) {
                ticket.signal.wake();
            }
        } else if let Some(winner) = self.x_queue.pop_front() {
            winner.signal.wake();
        }
    }
}

/// The logical lock of a single page. Exactly one exists per page alive in
/// the buffer pool, created together with the page.
pub struct PageLock {
    pid: PageId,
    detector: Weak<DeadlockDetector>,
    state: Mutex<LockState>,
}

impl PartialEq for PageLock {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid
    }
}

impl Eq for PageLock {}

impl Hash for PageLock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pid.hash(state);
    }
}

impl PageLock {
    pub fn new(pid: PageId, detector: &Arc<DeadlockDetector>) -> Arc<Self> {
        Arc::new(Self {
            pid,
            detector: Arc::downgrade(detector),
            state: Mutex::new(LockState::default()),
        })
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    /// Block until `tid` holds a shared lock on this page. Returns
    /// immediately if it already holds S or X. Fails with `Aborted` when the
    /// deadlock detector trips the wait.
    pub fn s_lock(self: &Arc<Self>, tid: TransactionId) -> Result<(), Aborted> {
        self.acquire(tid, Mode::Shared)
    }

    /// Block until `tid` holds the exclusive lock. Returns immediately if it
    /// already holds X; the sole S-holder upgrades. Fails with `Aborted`
    /// when the deadlock detector trips the wait.
    pub fn x_lock(self: &Arc<Self>, tid: TransactionId) -> Result<(), Aborted> {
        self.acquire(tid, Mode::Exclusive)
    }

    fn acquire(self: &Arc<Self>, tid: TransactionId, mode: Mode) -> Result<(), Aborted> {
        let ticket = Ticket::new(tid);
        {
            let mut st = self.state.lock();
            if st.try_grant(tid, mode) {
                return Ok(());
            }
            st.enqueue(ticket.clone(), mode);
        }
        debug!("txn {} waits for {:?} on page {}", tid, mode, self.pid);
        loop {
            self.register_wait(&ticket);
            match ticket.signal.wait() {
                Wake::Retry => {
                    let mut st = self.state.lock();
                    if st.try_grant(tid, mode) {
                        drop(st);
                        self.clear_wait(tid);
                        debug!("txn {} granted {:?} on page {}", tid, mode, self.pid);
                        return Ok(());
                    }
                    // Lost the race against another woken waiter; go back
                    // to sleep on the same ticket.
                    st.enqueue(ticket.clone(), mode);
                }
                Wake::Aborted => {
                    self.state.lock().dequeue(&ticket, mode);
                    self.clear_wait(tid);
                    debug!("txn {} aborted while waiting on page {}", tid, self.pid);
                    return Err(Aborted { tid });
                }
            }
        }
    }

    /// Release a shared hold and run the wakeup lottery.
    ///
    /// Panics if `tid` does not hold S: releasing a lock you do not hold is
    /// a programmer error.
    pub fn s_unlock(&self, tid: TransactionId) {
        let mut st = self.state.lock();
        assert!(
            st.s_holders.remove(&tid),
            "txn {} releases an S lock it does not hold on page {}",
            tid,
            self.pid
        );
        st.run_lottery();
    }

    /// Release the exclusive hold and run the wakeup lottery.
    ///
    /// Panics if `tid` does not hold X.
    pub fn x_unlock(&self, tid: TransactionId) {
        let mut st = self.state.lock();
        assert_eq!(
            st.x_holder,
            Some(tid),
            "txn {} releases an X lock it does not hold on page {}",
            tid,
            self.pid
        );
        st.x_holder = None;
        st.run_lottery();
    }

    /// Drop every hold `tid` has on this page and cancel any tickets it has
    /// waiting, then run the wakeup lottery. Called on commit or abort.
    pub fn release_all(&self, tid: TransactionId) {
        {
            let mut st = self.state.lock();
            if st.x_holder == Some(tid) {
                st.x_holder = None;
            }
            st.s_holders.remove(&tid);
            st.s_pool.retain(|t| t.tid != tid);
            st.x_queue.retain(|t| t.tid != tid);
            st.run_lottery();
        }
        self.clear_wait(tid);
    }

    pub fn holds_lock(&self, tid: TransactionId) -> bool {
        let st = self.state.lock();
        st.s_holders.contains(&tid) || st.x_holder == Some(tid)
    }

    pub fn holds_s_lock(&self, tid: TransactionId) -> bool {
        self.state.lock().s_holders.contains(&tid)
    }

    pub fn holds_x_lock(&self, tid: TransactionId) -> bool {
        self.state.lock().x_holder == Some(tid)
    }

    /// Snapshot of the current holders: the shared set if any transaction
    /// holds S, else the exclusive holder, else empty.
    pub fn holders(&self) -> Vec<TransactionId> {
        let st = self.state.lock();
        if !st.s_holders.is_empty() {
            st.s_holders.iter().copied().collect()
        } else if let Some(x) = st.x_holder {
            vec![x]
        } else {
            Vec::new()
        }
    }

    fn register_wait(self: &Arc<Self>, ticket: &Ticket) {
        if let Some(detector) = self.detector.upgrade() {
            detector.wait_for(ticket.tid, self.clone(), ticket.signal.clone());
        }
    }

    fn clear_wait(&self, tid: TransactionId) {
        if let Some(detector) = self.detector.upgrade() {
            detector.unwait(tid, self);
        }
    }
}
