// Aggregation over one column with optional single-column grouping.

use std::collections::HashMap;
use std::sync::Arc;

use super::tuple_iterator::TupleIterator;
use super::{Operator, QueryError, QueryResult};
use crate::catalog::schema::{FieldType, Schema};
use crate::catalog::value::Value;
use crate::storage::tuple::Tuple;

/// Aggregate functions the aggregators compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

/// Capability shared by the concrete aggregators: fold tuples in one at a
/// time, then read the grouped results back out as an operator.
pub trait Aggregator {
    /// Fold one tuple into the running aggregate.
    fn merge(&mut self, tuple: &Tuple);

    /// Snapshot the aggregate results as an in-memory operator producing
    /// (group, value) rows, or a single value row without grouping.
    fn iterator(&self) -> TupleIterator;
}

/// Running accumulator for one group. Sums are kept in 64 bits so AVG does
/// not lose precision to a running mean.
#[derive(Clone, Copy)]
struct Acc {
    acc: i64,
    count: i64,
}

impl Acc {
    fn new(op: AggOp) -> Self {
        let acc = match op {
            AggOp::Max => i64::MIN,
            AggOp::Min => i64::MAX,
            _ => 0,
        };
        Self { acc, count: 0 }
    }

    fn fold(&mut self, op: AggOp, v: i64) {
        match op {
            AggOp::Count => self.acc += 1,
            AggOp::Sum => self.acc += v,
            AggOp::Max => self.acc = self.acc.max(v),
            AggOp::Min => self.acc = self.acc.min(v),
            AggOp::Avg => {
                self.acc += v;
                self.count += 1;
            }
        }
    }

    fn result(&self, op: AggOp) -> i32 {
        match op {
            AggOp::Avg => (self.acc / self.count.max(1)) as i32,
            _ => self.acc as i32,
        }
    }
}

/// Aggregates an integer column.
pub struct IntAggregator {
    group_by: Option<(usize, FieldType)>,
    field: usize,
    op: AggOp,
    groups: HashMap<Value, Acc>,
    plain: Acc,
}

impl IntAggregator {
    pub fn new(group_by: Option<(usize, FieldType)>, field: usize, op: AggOp) -> Self {
        Self {
            group_by,
            field,
            op,
            groups: HashMap::new(),
            plain: Acc::new(op),
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge(&mut self, tuple: &Tuple) {
        let Value::Int(v) = tuple.value(self.field) else {
            panic!("non-integer field handed to the integer aggregator");
        };
        let v = *v as i64;
        match self.group_by {
            None => self.plain.fold(self.op, v),
            Some((group_field, _)) => {
                let key = tuple.value(group_field).clone();
                let op = self.op;
                self.groups
                    .entry(key)
                    .or_insert_with(|| Acc::new(op))
                    .fold(op, v);
            }
        }
    }

    fn iterator(&self) -> TupleIterator {
        match self.group_by {
            None => {
                let schema = Arc::new(Schema::new(vec![FieldType::Int]));
                let row = Tuple::new(schema.clone(), vec![Value::Int(self.plain.result(self.op))]);
                TupleIterator::new(schema, vec![row])
            }
            Some((_, group_type)) => {
                let schema = Arc::new(Schema::new(vec![group_type, FieldType::Int]));
                let rows = self
                    .groups
                    .iter()
                    .map(|(key, acc)| {
                        Tuple::new(
                            schema.clone(),
                            vec![key.clone(), Value::Int(acc.result(self.op))],
                        )
                    })
                    .collect();
                TupleIterator::new(schema, rows)
            }
        }
    }
}

/// Counts a text column; COUNT is the only aggregate defined over text.
pub struct TextAggregator {
    group_by: Option<(usize, FieldType)>,
    counts: HashMap<Value, i64>,
    plain: i64,
}

impl TextAggregator {
    /// Panics unless `op` is COUNT.
    pub fn new(group_by: Option<(usize, FieldType)>, op: AggOp) -> Self {
        assert_eq!(
            op,
            AggOp::Count,
            "text fields can only be aggregated by COUNT"
        );
        Self {
            group_by,
            counts: HashMap::new(),
            plain: 0,
        }
    }
}

impl Aggregator for TextAggregator {
    fn merge(&mut self, tuple: &Tuple) {
        match self.group_by {
            None => self.plain += 1,
            Some((group_field, _)) => {
                let key = tuple.value(group_field).clone();
                *self.counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    fn iterator(&self) -> TupleIterator {
        match self.group_by {
            None => {
                let schema = Arc::new(Schema::new(vec![FieldType::Int]));
                let row = Tuple::new(schema.clone(), vec![Value::Int(self.plain as i32)]);
                TupleIterator::new(schema, vec![row])
            }
            Some((_, group_type)) => {
                let schema = Arc::new(Schema::new(vec![group_type, FieldType::Int]));
                let rows = self
                    .counts
                    .iter()
                    .map(|(key, count)| {
                        Tuple::new(
                            schema.clone(),
                            vec![key.clone(), Value::Int(*count as i32)],
                        )
                    })
                    .collect();
                TupleIterator::new(schema, rows)
            }
        }
    }
}

/// The aggregation operator. At open it drains its child into an aggregator
/// picked by the aggregated field's type, then streams the grouped results.
pub struct Aggregate {
    child: Box<dyn Operator>,
    field: usize,
    group_by: Option<usize>,
    op: AggOp,
    results: Option<TupleIterator>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        field: usize,
        group_by: Option<usize>,
        op: AggOp,
    ) -> Self {
        Self {
            child,
            field,
            group_by,
            op,
            results: None,
        }
    }

    pub fn op(&self) -> AggOp {
        self.op
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> QueryResult<()> {
        self.child.open()?;
        let child_schema = self.child.schema();
        let group_by = self
            .group_by
            .map(|g| (g, child_schema.field_type(g)));
        let mut aggregator: Box<dyn Aggregator> = match child_schema.field_type(self.field) {
            FieldType::Int => Box::new(IntAggregator::new(group_by, self.field, self.op)),
            FieldType::Text => Box::new(TextAggregator::new(group_by, self.op)),
        };
        while let Some(tuple) = self.child.next()? {
            aggregator.merge(&tuple);
        }
        let mut results = aggregator.iterator();
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        match self.results.as_mut() {
            Some(results) => results.next(),
            None => Err(QueryError::NotOpen),
        }
    }

    fn rewind(&mut self) -> QueryResult<()> {
        match self.results.as_mut() {
            Some(results) => results.rewind(),
            None => Err(QueryError::NotOpen),
        }
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn schema(&self) -> Arc<Schema> {
        let child_schema = self.child.schema();
        match self.group_by {
            None => Arc::new(Schema::new(vec![FieldType::Int])),
            Some(g) => Arc::new(Schema::new(vec![
                child_schema.field_type(g),
                FieldType::Int,
            ])),
        }
    }
}
