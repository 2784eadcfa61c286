// Heap file: an unordered collection of fixed-size pages on one disk file.
//
// The file itself is dumb storage. All locking happens through the buffer
// pool, which every tuple-level operation here goes back through to fetch
// its pages.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::error::HeapFileError;
use crate::catalog::schema::Schema;
use crate::common::types::{page_size, PageId, Permission, TableId};
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::page::HeapPage;
use crate::storage::tuple::Tuple;
use crate::transaction::concurrency::DeadlockDetector;
use crate::transaction::TransactionId;

pub struct HeapFile {
    table_id: TableId,
    schema: Arc<Schema>,
    file: Mutex<File>,
}

impl HeapFile {
    /// Open (or create) the backing file for one table.
    pub fn open(
        path: impl AsRef<Path>,
        table_id: TableId,
        schema: Arc<Schema>,
    ) -> Result<Self, HeapFileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self {
            table_id,
            schema,
            file: Mutex::new(file),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Pages currently in the file.
    pub fn num_pages(&self) -> Result<usize, HeapFileError> {
        let len = self.file.lock().metadata()?.len() as usize;
        Ok(len.div_ceil(page_size()))
    }

    /// Read the page at `pid` from disk and wrap it with a fresh lock.
    pub fn read_page(
        &self,
        pid: PageId,
        detector: &Arc<DeadlockDetector>,
    ) -> Result<HeapPage, HeapFileError> {
        if pid.table_id != self.table_id {
            return Err(HeapFileError::WrongTable(pid));
        }
        let mut buf = vec![0u8; page_size()];
        {
            let mut file = self.file.lock();
            let offset = pid.page_no as u64 * page_size() as u64;
            if offset + page_size() as u64 > file.metadata()?.len() {
                return Err(HeapFileError::NoSuchPage(pid));
            }
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }
        Ok(HeapPage::from_bytes(
            pid,
            self.schema.clone(),
            detector,
            &buf,
        )?)
    }

    /// Write a page image back to its position in the file.
    pub fn write_page(&self, page: &HeapPage) -> Result<(), HeapFileError> {
        let pid = page.pid();
        if pid.table_id != self.table_id {
            return Err(HeapFileError::WrongTable(pid));
        }
        let data = page.to_bytes()?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pid.page_no as u64 * page_size() as u64))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    /// Append a fresh all-zero page to the file and return its id. The page
    /// is written to disk immediately so a subsequent pool fetch finds it.
    pub fn append_empty_page(&self) -> Result<PageId, HeapFileError> {
        let mut file = self.file.lock();
        let page_no = (file.metadata()?.len() as usize).div_ceil(page_size()) as u32;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;
        debug!("table {} grew to page {}", self.table_id, page_no);
        Ok(PageId::new(self.table_id, page_no))
    }

    /// Insert a tuple into a page with room, appending a new page when every
    /// existing one is full. Returns the dirtied pages.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<Arc<HeapPage>>, BufferPoolError> {
        let pid = match self.find_free_page(pool, tid)? {
            Some(pid) => pid,
            None => self.append_empty_page().map_err(BufferPoolError::from)?,
        };
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        page.insert_tuple(tuple).map_err(HeapFileError::from)?;
        Ok(vec![page])
    }

    /// Scan back to front for a page with an empty slot. A page that turns
    /// out full gives its read lock back immediately; the check does not
    /// affect consistency.
    fn find_free_page(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
    ) -> Result<Option<PageId>, BufferPoolError> {
        for page_no in (0..self.num_pages().map_err(BufferPoolError::from)?).rev() {
            let pid = PageId::new(self.table_id, page_no as u32);
            let page = pool.get_page(tid, pid, Permission::ReadOnly)?;
            if page.unused_slots() > 0 {
                return Ok(Some(pid));
            }
            page.pg_lock().s_unlock(tid);
        }
        Ok(None)
    }

    /// Delete a tuple from the page recorded in its record id. Returns the
    /// dirtied pages.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<Arc<HeapPage>>, BufferPoolError> {
        let rid = tuple
            .record_id()
            .ok_or(HeapFileError::TupleNotStored)
            .map_err(BufferPoolError::from)?;
        if rid.pid.table_id != self.table_id {
            return Err(HeapFileError::WrongTable(rid.pid).into());
        }
        let page = pool.get_page(tid, rid.pid, Permission::ReadWrite)?;
        page.delete_tuple(tuple).map_err(HeapFileError::from)?;
        Ok(vec![page])
    }
}
