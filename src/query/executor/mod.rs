// Pull-based query operators.
//
// Each operator implements the same open/next/rewind/close interface and
// pulls rows from its child one at a time. Blocking happens only inside the
// buffer pool's lock acquisitions.

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod predicate;
pub mod scan;
pub mod subset;
pub mod tuple_iterator;

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::storage::buffer::BufferPoolError;
use crate::storage::tuple::Tuple;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("operator is not open")]
    NotOpen,

    #[error("schema mismatch between child operator and table")]
    SchemaMismatch,

    #[error("buffer pool error: {0}")]
    Buffer(#[from] BufferPoolError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// The interface every query operator implements. `next` returns None once
/// the operator is exhausted; `rewind` restarts it from the top.
pub trait Operator {
    fn open(&mut self) -> QueryResult<()>;

    fn next(&mut self) -> QueryResult<Option<Tuple>>;

    fn rewind(&mut self) -> QueryResult<()>;

    fn close(&mut self);

    /// Layout of the rows this operator produces.
    fn schema(&self) -> Arc<Schema>;
}

pub use aggregate::{AggOp, Aggregate, Aggregator, IntAggregator, TextAggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use predicate::{CmpOp, Predicate};
pub use scan::SeqScan;
pub use subset::SubsetIterator;
pub use tuple_iterator::TupleIterator;
