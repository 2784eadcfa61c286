// Table registry mapping table ids to their heap files.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::schema::Schema;
use crate::common::types::TableId;
use crate::storage::heap::HeapFile;

/// Registry of the database's tables. A handle to it is passed explicitly to
/// the buffer pool and the operators instead of living in process-wide
/// state.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a heap file under its table id, replacing any previous file
    /// with the same id.
    pub fn add_table(&self, file: Arc<HeapFile>) {
        self.tables.write().insert(file.table_id(), file);
    }

    pub fn file(&self, table_id: TableId) -> Option<Arc<HeapFile>> {
        self.tables.read().get(&table_id).cloned()
    }

    pub fn schema(&self, table_id: TableId) -> Option<Arc<Schema>> {
        self.tables.read().get(&table_id).map(|f| f.schema().clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }
}
