// Sequential scan over a table's heap file.

use std::sync::Arc;

use super::{Operator, QueryError, QueryResult};
use crate::catalog::schema::Schema;
use crate::storage::buffer::BufferPool;
use crate::storage::heap::{HeapFile, HeapFileIterator};
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// Leaf operator producing every stored tuple of one table under the
/// transaction's read locks.
pub struct SeqScan {
    schema: Arc<Schema>,
    iter: HeapFileIterator,
    opened: bool,
}

impl SeqScan {
    pub fn new(pool: Arc<BufferPool>, file: Arc<HeapFile>, tid: TransactionId) -> Self {
        let schema = file.schema().clone();
        Self {
            schema,
            iter: HeapFileIterator::new(file, pool, tid),
            opened: false,
        }
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> QueryResult<()> {
        self.iter.open()?;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        if !self.opened {
            return Err(QueryError::NotOpen);
        }
        Ok(self.iter.next()?)
    }

    fn rewind(&mut self) -> QueryResult<()> {
        self.iter.rewind()?;
        Ok(())
    }

    fn close(&mut self) {
        self.iter.close();
        self.opened = false;
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }
}
