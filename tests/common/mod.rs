// Shared helpers for the integration tests.

use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use berkutdb::catalog::schema::{FieldType, Schema};
use berkutdb::catalog::value::Value;
use berkutdb::catalog::Catalog;
use berkutdb::storage::heap::HeapFile;
use berkutdb::storage::tuple::Tuple;
use berkutdb::transaction::TransactionId;
use berkutdb::BufferPool;

/// Initialize logging once for the whole test binary.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn two_int_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![FieldType::Int, FieldType::Int]))
}

/// Build a pool over one empty table backed by a temp file. The temp file
/// handle must outlive the pool.
#[allow(dead_code)]
pub fn create_test_pool(
    capacity: usize,
    table_id: u32,
    schema: Arc<Schema>,
) -> Result<(Arc<BufferPool>, Arc<HeapFile>, NamedTempFile)> {
    init_logging();
    let file = NamedTempFile::new()?;
    let heap = Arc::new(HeapFile::open(file.path(), table_id, schema)?);
    let catalog = Arc::new(Catalog::new());
    catalog.add_table(heap.clone());
    let pool = Arc::new(BufferPool::new(capacity, catalog));
    Ok((pool, heap, file))
}

/// Insert `count` (i, i * 10) tuples through the pool under one committed
/// transaction.
#[allow(dead_code)]
pub fn populate(pool: &Arc<BufferPool>, table_id: u32, schema: &Arc<Schema>, count: i32) -> Result<()> {
    let tid = TransactionId::new();
    for i in 0..count {
        pool.insert_tuple(
            tid,
            table_id,
            Tuple::new(schema.clone(), vec![Value::Int(i), Value::Int(i * 10)]),
        )?;
    }
    pool.transaction_complete(tid, true);
    Ok(())
}
