// berkutdb: a page-oriented heap-file storage engine with a transactional
// buffer pool, page-granular two-phase locking and wait-for deadlock
// detection, consumed by a small pull-based operator model.

pub mod catalog;
pub mod common;
pub mod optimizer;
pub mod query;
pub mod storage;
pub mod transaction;

pub use catalog::Catalog;
pub use storage::buffer::{BufferPool, BufferPoolError};
pub use transaction::{Aborted, Transaction, TransactionId};
