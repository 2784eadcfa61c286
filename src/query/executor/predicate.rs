// Field-against-constant comparison predicates.

use std::cmp::Ordering;

use crate::catalog::value::Value;
use crate::storage::tuple::Tuple;

/// Comparison operators a predicate can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Equals,
    GreaterThan,
    LessThan,
    GreaterThanOrEq,
    LessThanOrEq,
    NotEquals,
}

/// Compares one tuple field against a constant operand.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: CmpOp,
    operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: CmpOp, operand: Value) -> Self {
        Self { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Whether the tuple satisfies the comparison. Values of mismatched
    /// types never match.
    pub fn eval(&self, tuple: &Tuple) -> bool {
        match (tuple.value(self.field), &self.operand) {
            (Value::Int(a), Value::Int(b)) => Self::satisfies(a.cmp(b), self.op),
            (Value::Text(a), Value::Text(b)) => Self::satisfies(a.cmp(b), self.op),
            _ => false,
        }
    }

    fn satisfies(ord: Ordering, op: CmpOp) -> bool {
        match op {
            CmpOp::Equals => ord == Ordering::Equal,
            CmpOp::GreaterThan => ord == Ordering::Greater,
            CmpOp::LessThan => ord == Ordering::Less,
            CmpOp::GreaterThanOrEq => ord != Ordering::Less,
            CmpOp::LessThanOrEq => ord != Ordering::Greater,
            CmpOp::NotEquals => ord != Ordering::Equal,
        }
    }
}
