// End-to-end operator pipelines over real tables.

mod common;

use std::sync::Arc;

use berkutdb::catalog::value::Value;
use berkutdb::query::executor::{
    AggOp, Aggregate, CmpOp, Delete, Filter, Insert, Operator, Predicate, SeqScan, TupleIterator,
};
use berkutdb::storage::tuple::Tuple;
use berkutdb::transaction::TransactionId;

fn collect(op: &mut dyn Operator) -> Vec<Tuple> {
    let mut out = Vec::new();
    while let Some(tuple) = op.next().unwrap() {
        out.push(tuple);
    }
    out
}

#[test]
fn filter_over_scan_selects_matching_rows() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 21, schema.clone()).unwrap();
    common::populate(&pool, 21, &schema, 10).unwrap();

    let tid = TransactionId::new();
    let scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    let mut filter = Filter::new(
        Predicate::new(0, CmpOp::GreaterThanOrEq, Value::Int(7)),
        Box::new(scan),
    );
    filter.open().unwrap();
    let rows = collect(&mut filter);
    assert_eq!(rows.len(), 3);
    for row in &rows {
        let Value::Int(k) = row.value(0) else {
            panic!("unexpected field type");
        };
        assert!(*k >= 7);
    }
    filter.close();
    pool.transaction_complete(tid, true);
}

#[test]
fn insert_operator_reports_count_and_stores_rows() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 22, schema.clone()).unwrap();

    let rows: Vec<Tuple> = (0..4)
        .map(|i| Tuple::new(schema.clone(), vec![Value::Int(i), Value::Int(-i)]))
        .collect();
    let child = TupleIterator::new(schema.clone(), rows);

    let tid = TransactionId::new();
    let mut insert = Insert::new(pool.clone(), tid, 22, Box::new(child)).unwrap();
    insert.open().unwrap();
    let report = insert.next().unwrap().unwrap();
    assert_eq!(report.value(0), &Value::Int(4));
    // The count row is emitted exactly once.
    assert!(insert.next().unwrap().is_none());
    insert.close();
    pool.transaction_complete(tid, true);

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    scan.open().unwrap();
    assert_eq!(collect(&mut scan).len(), 4);
    scan.close();
    pool.transaction_complete(tid, true);
}

#[test]
fn insert_rejects_mismatched_child_schema() {
    let schema = common::two_int_schema();
    let (pool, _heap, _file) = common::create_test_pool(8, 23, schema).unwrap();

    let wrong = Arc::new(berkutdb::catalog::schema::Schema::new(vec![
        berkutdb::catalog::schema::FieldType::Int,
    ]));
    let child = TupleIterator::new(wrong.clone(), Vec::new());
    let tid = TransactionId::new();
    assert!(Insert::new(pool.clone(), tid, 23, Box::new(child)).is_err());
}

#[test]
fn delete_operator_removes_filtered_rows() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 24, schema.clone()).unwrap();
    common::populate(&pool, 24, &schema, 10).unwrap();

    let tid = TransactionId::new();
    let scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    let filter = Filter::new(
        Predicate::new(0, CmpOp::LessThan, Value::Int(4)),
        Box::new(scan),
    );
    let mut delete = Delete::new(pool.clone(), tid, Box::new(filter));
    delete.open().unwrap();
    let report = delete.next().unwrap().unwrap();
    assert_eq!(report.value(0), &Value::Int(4));
    delete.close();
    pool.transaction_complete(tid, true);

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    scan.open().unwrap();
    assert_eq!(collect(&mut scan).len(), 6);
    scan.close();
    pool.transaction_complete(tid, true);
}

#[test]
fn aggregate_over_scan_counts_and_sums() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 25, schema.clone()).unwrap();
    common::populate(&pool, 25, &schema, 6).unwrap();

    let tid = TransactionId::new();
    let scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    let mut count = Aggregate::new(Box::new(scan), 0, None, AggOp::Count);
    count.open().unwrap();
    assert_eq!(collect(&mut count)[0].value(0), &Value::Int(6));
    count.close();

    // Second field holds i * 10, so the sum over 0..6 is 150.
    let scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    let mut sum = Aggregate::new(Box::new(scan), 1, None, AggOp::Sum);
    sum.open().unwrap();
    assert_eq!(collect(&mut sum)[0].value(0), &Value::Int(150));
    sum.close();
    pool.transaction_complete(tid, true);
}

#[test]
fn scan_before_open_is_an_error() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 26, schema).unwrap();

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(pool.clone(), heap.clone(), tid);
    assert!(scan.next().is_err());
    pool.transaction_complete(tid, true);
}
