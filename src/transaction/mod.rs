// Transaction identity and lifecycle.

pub mod concurrency;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::storage::buffer::BufferPool;

static NEXT_TID: AtomicU64 = AtomicU64::new(0);

/// Globally unique, monotonically increasing transaction identifier.
/// Ordering doubles as age: the smaller id is the older transaction, which
/// is what the deadlock detector's victim selection relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned from a blocked lock request that was cancelled because the
/// deadlock detector chose this transaction as a victim. Expected control
/// flow, not a failure: the driver must abort the transaction and may retry
/// it from the top.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("transaction {tid} aborted as a deadlock victim")]
pub struct Aborted {
    pub tid: TransactionId,
}

/// Driver-side handle for one transaction: a fresh id plus the completion
/// calls. One transaction runs on one thread for its whole life.
pub struct Transaction {
    id: TransactionId,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: TransactionId::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Flush this transaction's dirty pages and release every lock it holds.
    pub fn commit(&self, pool: &BufferPool) {
        pool.transaction_complete(self.id, true);
    }

    /// Discard this transaction's dirty pages and release every lock it
    /// holds. Must be called after a lock request returns `Aborted`.
    pub fn abort(&self, pool: &BufferPool) {
        pool.transaction_complete(self.id, false);
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
