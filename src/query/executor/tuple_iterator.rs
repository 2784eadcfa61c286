// In-memory operator over a fixed set of tuples.

use std::sync::Arc;

use super::{Operator, QueryError, QueryResult};
use crate::catalog::schema::Schema;
use crate::storage::tuple::Tuple;

/// Serves a materialized tuple list through the operator interface.
/// Aggregators return their results through it.
pub struct TupleIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    cursor: Option<usize>,
}

impl TupleIterator {
    pub fn new(schema: Arc<Schema>, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            cursor: None,
        }
    }
}

impl Operator for TupleIterator {
    fn open(&mut self) -> QueryResult<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(QueryError::NotOpen);
        };
        match self.tuples.get(*cursor) {
            Some(tuple) => {
                *cursor += 1;
                Ok(Some(tuple.clone()))
            }
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> QueryResult<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }
}
