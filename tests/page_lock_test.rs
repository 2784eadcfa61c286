// Contention behavior of the page lock.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use berkutdb::common::types::PageId;
use berkutdb::transaction::concurrency::{DeadlockDetector, PageLock};
use berkutdb::transaction::TransactionId;

/// Time to wait before checking the state of lock contention.
const TIMEOUT: Duration = Duration::from_millis(100);

fn grab_s(lock: &Arc<PageLock>, tid: TransactionId) {
    let lock = lock.clone();
    thread::spawn(move || {
        let _ = lock.s_lock(tid);
    });
}

fn grab_x(lock: &Arc<PageLock>, tid: TransactionId) {
    let lock = lock.clone();
    thread::spawn(move || {
        let _ = lock.x_lock(tid);
    });
}

#[test]
fn multiple_s_holders_coexist() {
    common::init_logging();
    let detector = DeadlockDetector::start();
    let lock = PageLock::new(PageId::new(0, 0), &detector);

    let tids: Vec<TransactionId> = (0..3).map(|_| TransactionId::new()).collect();
    for &tid in &tids {
        grab_s(&lock, tid);
    }
    thread::sleep(TIMEOUT);
    for &tid in &tids {
        assert!(lock.holds_s_lock(tid));
        assert!(!lock.holds_x_lock(tid));
    }
}

#[test]
fn x_excludes_new_acquirers() {
    common::init_logging();
    let detector = DeadlockDetector::start();
    let lock = PageLock::new(PageId::new(0, 0), &detector);

    let t0 = TransactionId::new();
    lock.x_lock(t0).unwrap();

    let readers: Vec<TransactionId> = (0..3).map(|_| TransactionId::new()).collect();
    for &tid in &readers {
        grab_s(&lock, tid);
    }
    thread::sleep(TIMEOUT);
    for &tid in &readers {
        assert!(!lock.holds_s_lock(tid));
    }

    let writers: Vec<TransactionId> = (0..3).map(|_| TransactionId::new()).collect();
    let acquired = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for &tid in &writers {
        let lock = lock.clone();
        let acquired = acquired.clone();
        handles.push(thread::spawn(move || {
            lock.x_lock(tid).unwrap();
            acquired.fetch_add(1, Ordering::SeqCst);
            lock.x_unlock(tid);
        }));
    }
    thread::sleep(TIMEOUT);
    for &tid in &writers {
        assert!(!lock.holds_x_lock(tid));
    }
    assert_eq!(acquired.load(Ordering::SeqCst), 0);

    // Releasing the writer lets everyone through: the readers are granted
    // in one batch, the writers one at a time as each releases.
    lock.release_all(t0);
    thread::sleep(TIMEOUT);
    for &tid in &readers {
        assert!(lock.holds_s_lock(tid));
    }
    for &tid in &readers {
        lock.s_unlock(tid);
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(acquired.load(Ordering::SeqCst), 3);
}

#[test]
fn release_then_reacquire() {
    common::init_logging();
    let detector = DeadlockDetector::start();
    let lock = PageLock::new(PageId::new(0, 0), &detector);
    let tid = TransactionId::new();

    lock.x_lock(tid).unwrap();
    assert!(lock.holds_x_lock(tid));
    lock.x_unlock(tid);
    assert!(!lock.holds_x_lock(tid));
    lock.s_lock(tid).unwrap();
    assert!(lock.holds_s_lock(tid));
    lock.s_unlock(tid);
    assert!(!lock.holds_s_lock(tid));
}

#[test]
fn s_unlock_round_trip_leaves_state_clean() {
    common::init_logging();
    let detector = DeadlockDetector::start();
    let lock = PageLock::new(PageId::new(0, 0), &detector);
    let tid = TransactionId::new();

    lock.s_lock(tid).unwrap();
    lock.s_unlock(tid);
    assert!(lock.holders().is_empty());
    assert!(!lock.holds_lock(tid));

    // A second reader starting from the clean state acquires instantly.
    let t2 = TransactionId::new();
    lock.s_lock(t2).unwrap();
    assert!(lock.holds_s_lock(t2));
}

#[test]
fn waiting_writer_takes_over_after_batch_of_readers() {
    common::init_logging();
    let detector = DeadlockDetector::start();
    let lock = PageLock::new(PageId::new(0, 0), &detector);

    let reader = TransactionId::new();
    lock.s_lock(reader).unwrap();

    let writer = TransactionId::new();
    let handle = {
        let lock = lock.clone();
        thread::spawn(move || lock.x_lock(writer))
    };
    thread::sleep(TIMEOUT);
    assert!(!lock.holds_x_lock(writer));

    lock.s_unlock(reader);
    handle.join().unwrap().unwrap();
    assert!(lock.holds_x_lock(writer));
}
