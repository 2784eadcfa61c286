// Page-at-a-time tuple scan over a heap file.

use std::sync::Arc;

use super::heap_file::HeapFile;
use crate::common::types::{PageId, Permission};
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// Iterates every stored tuple of a heap file, fetching pages through the
/// buffer pool under the transaction's read locks. The locks stay held until
/// the transaction completes, per two-phase locking.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    next_page_no: usize,
    current: Option<std::vec::IntoIter<Tuple>>,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page_no: 0,
            current: None,
        }
    }

    /// Position at the first stored tuple. A file with no tuples yields an
    /// immediately exhausted iterator.
    pub fn open(&mut self) -> Result<(), BufferPoolError> {
        self.next_page_no = 0;
        self.current = None;
        self.advance()
    }

    /// Next tuple, or None once the scan is exhausted or before `open`.
    pub fn next(&mut self) -> Result<Option<Tuple>, BufferPoolError> {
        loop {
            let Some(iter) = self.current.as_mut() else {
                return Ok(None);
            };
            if let Some(tuple) = iter.next() {
                return Ok(Some(tuple));
            }
            self.advance()?;
            if self.current.is_none() {
                return Ok(None);
            }
        }
    }

    pub fn rewind(&mut self) -> Result<(), BufferPoolError> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.next_page_no = 0;
        self.current = None;
    }

    /// Load the next page that has at least one tuple, or leave the cursor
    /// empty at end of file.
    fn advance(&mut self) -> Result<(), BufferPoolError> {
        let num_pages = self.file.num_pages()?;
        while self.next_page_no < num_pages {
            let pid = PageId::new(self.file.table_id(), self.next_page_no as u32);
            self.next_page_no += 1;
            let page = self.pool.get_page(self.tid, pid, Permission::ReadOnly)?;
            let tuples = page.tuples();
            if !tuples.is_empty() {
                self.current = Some(tuples.into_iter());
                return Ok(());
            }
        }
        self.current = None;
        Ok(())
    }
}
