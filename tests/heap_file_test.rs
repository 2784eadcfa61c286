// Heap file growth, scans, and tuple placement.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use berkutdb::catalog::value::Value;
use berkutdb::common::types::PageId;
use berkutdb::storage::heap::{HeapFileError, HeapFileIterator};
use berkutdb::storage::page::slots_per_page;
use berkutdb::storage::tuple::Tuple;
use berkutdb::transaction::TransactionId;

#[test]
fn insert_appends_pages_when_full() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 11, schema.clone()).unwrap();

    let per_page = slots_per_page(&schema) as i32;
    common::populate(&pool, 11, &schema, per_page + 1).unwrap();
    assert_eq!(heap.num_pages().unwrap(), 2);
}

#[test]
fn iterator_visits_every_tuple_across_pages() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 12, schema.clone()).unwrap();

    let per_page = slots_per_page(&schema) as i32;
    let count = per_page + 10;
    common::populate(&pool, 12, &schema, count).unwrap();

    let tid = TransactionId::new();
    let mut iter = HeapFileIterator::new(heap.clone(), pool.clone(), tid);
    iter.open().unwrap();
    let mut keys = HashSet::new();
    while let Some(tuple) = iter.next().unwrap() {
        let Value::Int(k) = tuple.value(0) else {
            panic!("unexpected field type");
        };
        keys.insert(*k);
    }
    assert_eq!(keys.len(), count as usize);
    pool.transaction_complete(tid, true);
}

#[test]
fn iterator_rewind_restarts_scan() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 13, schema.clone()).unwrap();
    common::populate(&pool, 13, &schema, 5).unwrap();

    let tid = TransactionId::new();
    let mut iter = HeapFileIterator::new(heap.clone(), pool.clone(), tid);
    iter.open().unwrap();
    let mut first_pass = 0;
    while iter.next().unwrap().is_some() {
        first_pass += 1;
    }
    iter.rewind().unwrap();
    let mut second_pass = 0;
    while iter.next().unwrap().is_some() {
        second_pass += 1;
    }
    assert_eq!(first_pass, 5);
    assert_eq!(second_pass, 5);
    pool.transaction_complete(tid, true);
}

#[test]
fn empty_file_scans_as_empty() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(4, 14, schema).unwrap();

    let tid = TransactionId::new();
    let mut iter = HeapFileIterator::new(heap.clone(), pool.clone(), tid);
    iter.open().unwrap();
    assert!(iter.next().unwrap().is_none());
    pool.transaction_complete(tid, true);
}

#[test]
fn deleted_slot_is_reused() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(8, 15, schema.clone()).unwrap();
    common::populate(&pool, 15, &schema, 3).unwrap();

    // Delete one row.
    let tid = TransactionId::new();
    let mut iter = HeapFileIterator::new(heap.clone(), pool.clone(), tid);
    iter.open().unwrap();
    let doomed = iter.next().unwrap().unwrap();
    iter.close();
    pool.delete_tuple(tid, &doomed).unwrap();
    pool.transaction_complete(tid, true);

    // The next insert fills the freed slot instead of growing the file.
    let pages_before = heap.num_pages().unwrap();
    let tid = TransactionId::new();
    pool.insert_tuple(
        tid,
        15,
        Tuple::new(schema.clone(), vec![Value::Int(99), Value::Int(990)]),
    )
    .unwrap();
    pool.transaction_complete(tid, true);
    assert_eq!(heap.num_pages().unwrap(), pages_before);

    let tid = TransactionId::new();
    let mut iter = HeapFileIterator::new(heap.clone(), pool.clone(), tid);
    iter.open().unwrap();
    let mut count = 0;
    while iter.next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 3);
    pool.transaction_complete(tid, true);
}

#[test]
fn read_page_rejects_foreign_table() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(4, 16, schema).unwrap();
    heap.append_empty_page().unwrap();

    let foreign = PageId::new(999, 0);
    let result = heap.read_page(foreign, pool.detector());
    assert!(matches!(result, Err(HeapFileError::WrongTable(_))));
}

#[test]
fn read_page_past_end_of_file_fails() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(4, 17, schema).unwrap();

    let missing = PageId::new(17, 3);
    let result = heap.read_page(missing, pool.detector());
    assert!(matches!(result, Err(HeapFileError::NoSuchPage(_))));
}

#[test]
fn written_page_reads_back_identically() {
    let schema = common::two_int_schema();
    let (pool, heap, _file) = common::create_test_pool(4, 18, schema.clone()).unwrap();
    let pid = heap.append_empty_page().unwrap();

    let page = Arc::new(heap.read_page(pid, pool.detector()).unwrap());
    page.insert_tuple(Tuple::new(
        schema.clone(),
        vec![Value::Int(5), Value::Int(50)],
    ))
    .unwrap();
    heap.write_page(&page).unwrap();

    let reread = heap.read_page(pid, pool.detector()).unwrap();
    let tuples = reread.tuples();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0].value(1), &Value::Int(50));
}
