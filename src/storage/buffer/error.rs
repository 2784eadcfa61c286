use thiserror::Error;

use crate::common::types::{PageId, TableId};
use crate::storage::heap::HeapFileError;
use crate::transaction::Aborted;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("page {0} is not cached in the buffer pool")]
    PageNotCached(PageId),

    #[error("no table registered under id {0}")]
    UnknownTable(TableId),

    #[error("failed to evict: all pages in the buffer pool are dirty or locked")]
    NothingToEvict,

    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error("heap file error: {0}")]
    HeapFile(#[from] HeapFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
