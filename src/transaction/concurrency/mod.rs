// Page-level locking and deadlock handling.

pub mod deadlock;
pub mod lock_manager;
pub mod page_lock;

pub use deadlock::{DeadlockDetector, INTERVAL, THRESHOLD};
pub use lock_manager::LockManager;
pub use page_lock::PageLock;
