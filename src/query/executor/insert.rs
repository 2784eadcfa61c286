// Tuple insertion operator.

use std::sync::Arc;

use super::{Operator, QueryError, QueryResult};
use crate::catalog::schema::{FieldType, Schema};
use crate::catalog::value::Value;
use crate::common::types::TableId;
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// Drains its child and inserts every row into the target table through the
/// buffer pool, emitting a single row holding the insert count.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    child: Box<dyn Operator>,
    out_schema: Arc<Schema>,
    count: Option<i32>,
    emitted: bool,
}

impl Insert {
    /// Fails if the child's schema differs from the table's.
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        child: Box<dyn Operator>,
    ) -> QueryResult<Self> {
        let table_schema = pool
            .catalog()
            .schema(table_id)
            .ok_or(BufferPoolError::UnknownTable(table_id))?;
        if table_schema.as_ref() != child.schema().as_ref() {
            return Err(QueryError::SchemaMismatch);
        }
        Ok(Self {
            pool,
            tid,
            table_id,
            child,
            out_schema: Arc::new(Schema::with_names(
                vec![FieldType::Int],
                vec!["num_inserted"],
            )),
            count: None,
            emitted: false,
        })
    }
}

impl Operator for Insert {
    /// Drains the child and performs every insertion here, so opening the
    /// operator is what applies the side effects; `next` only reports them.
    fn open(&mut self) -> QueryResult<()> {
        self.child.open()?;
        let mut count = 0i32;
        while let Some(tuple) = self.child.next()? {
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
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

    /// Re-emits the count row; the insertions themselves are not repeated.
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
