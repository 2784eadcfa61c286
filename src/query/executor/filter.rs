// Relational select.

use std::sync::Arc;

use super::predicate::Predicate;
use super::{Operator, QueryResult};
use crate::catalog::schema::Schema;
use crate::storage::tuple::Tuple;

/// Passes through the child's rows that satisfy the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Self {
        Self { predicate, child }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Operator for Filter {
    fn open(&mut self) -> QueryResult<()> {
        self.child.open()
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        loop {
            match self.child.next()? {
                None => return Ok(None),
                Some(tuple) => {
                    if self.predicate.eval(&tuple) {
                        return Ok(Some(tuple));
                    }
                }
            }
        }
    }

    fn rewind(&mut self) -> QueryResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn schema(&self) -> Arc<Schema> {
        self.child.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::FieldType;
    use crate::catalog::value::Value;
    use crate::query::executor::predicate::CmpOp;
    use crate::query::executor::tuple_iterator::TupleIterator;

    fn rows(schema: &Arc<Schema>, values: &[i32]) -> Vec<Tuple> {
        values
            .iter()
            .map(|v| Tuple::new(schema.clone(), vec![Value::Int(*v)]))
            .collect()
    }

    #[test]
    fn test_filter_passes_matching_rows() {
        let schema = Arc::new(Schema::new(vec![FieldType::Int]));
        let child = TupleIterator::new(schema.clone(), rows(&schema, &[1, 7, 3, 9]));
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::GreaterThan, Value::Int(5)),
            Box::new(child),
        );

        filter.open().unwrap();
        assert_eq!(filter.next().unwrap().unwrap().value(0), &Value::Int(7));
        assert_eq!(filter.next().unwrap().unwrap().value(0), &Value::Int(9));
        assert!(filter.next().unwrap().is_none());
        filter.close();
    }

    #[test]
    fn test_filter_rewind_restarts() {
        let schema = Arc::new(Schema::new(vec![FieldType::Int]));
        let child = TupleIterator::new(schema.clone(), rows(&schema, &[2, 8]));
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::Equals, Value::Int(8)),
            Box::new(child),
        );

        filter.open().unwrap();
        assert!(filter.next().unwrap().is_some());
        assert!(filter.next().unwrap().is_none());
        filter.rewind().unwrap();
        assert!(filter.next().unwrap().is_some());
    }
}
