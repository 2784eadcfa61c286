// Tuple deletion operator.

use std::sync::Arc;

use super::{Operator, QueryError, QueryResult};
use crate::catalog::schema::{FieldType, Schema};
use crate::catalog::value::Value;
use crate::storage::buffer::BufferPool;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// Drains its child and deletes every row it produces through the buffer
/// pool, emitting a single row holding the delete count. The child's rows
/// must carry record ids, i.e. come from a scan.
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    out_schema: Arc<Schema>,
    count: Option<i32>,
    emitted: bool,
}

impl Delete {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, child: Box<dyn Operator>) -> Self {
        Self {
            pool,
            tid,
            child,
            out_schema: Arc::new(Schema::with_names(
                vec![FieldType::Int],
                vec!["num_deleted"],
            )),
            count: None,
            emitted: false,
        }
    }
}

impl Operator for Delete {
    /// Drains the child and performs every deletion here, so opening the
    /// operator is what applies the side effects; `next` only reports them.
    fn open(&mut self) -> QueryResult<()> {
        self.child.open()?;
        let mut count = 0i32;
        while let Some(tuple) = self.child.next()? {
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.count = Some(count);
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        let Some(count) = self.count else {
            return Err(QueryError::NotOpen);
        };
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;
        Ok(Some(Tuple::new(
            self.out_schema.clone(),
            vec![Value::Int(count)],
        )))
    }

    /// Re-emits the count row; the deletions themselves are not repeated.
    fn rewind(&mut self) -> QueryResult<()> {
        self.emitted = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.count = None;
        self.emitted = false;
    }

    fn schema(&self) -> Arc<Schema> {
        self.out_schema.clone()
    }
}
