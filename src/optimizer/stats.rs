// Per-table statistics for selectivity and scan-cost estimation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use super::histogram::{IntHistogram, TextHistogram};
use crate::catalog::value::Value;
use crate::common::types::TableId;
use crate::query::executor::predicate::CmpOp;
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::heap::{HeapFile, HeapFileError, HeapFileIterator};
use crate::transaction::TransactionId;

/// Buckets per histogram.
pub const NUM_HIST_BINS: usize = 100;

/// Default cost charged for reading one page, sequential or not.
pub const IO_COST_PER_PAGE: usize = 1000;

/// Statistics about one base table: tuple count, per-column histograms and
/// distinct-value counts.
pub struct TableStats {
    table_id: TableId,
    file: Arc<HeapFile>,
    io_cost_per_page: usize,
    ntups: usize,
    int_hists: HashMap<usize, IntHistogram>,
    text_hists: HashMap<usize, TextHistogram>,
    num_distinct: HashMap<usize, usize>,
}

impl TableStats {
    /// Scan the table twice: once to sample the range of every integer
    /// column, once to load the histograms and distinct counts. The scanning
    /// transaction commits before this returns, leaving no locks behind.
    pub fn build(
        pool: &Arc<BufferPool>,
        table_id: TableId,
        io_cost_per_page: usize,
    ) -> Result<Self, BufferPoolError> {
        let file = pool
            .catalog()
            .file(table_id)
            .ok_or(BufferPoolError::UnknownTable(table_id))?;
        let schema = file.schema().clone();
        let num_fields = schema.num_fields();

        let tid = TransactionId::new();
        let mut scan = HeapFileIterator::new(file.clone(), pool.clone(), tid);

        let mut mins: HashMap<usize, i32> = HashMap::new();
        let mut maxs: HashMap<usize, i32> = HashMap::new();
        let mut text_hists: HashMap<usize, TextHistogram> = HashMap::new();
        let mut seen: HashMap<usize, HashSet<Value>> = HashMap::new();
        for i in 0..num_fields {
            seen.insert(i, HashSet::new());
        }

        // First pass: sample min and max of the integer columns.
        let mut ntups = 0;
        scan.open()?;
        while let Some(tuple) = scan.next()? {
            ntups += 1;
            for i in 0..num_fields {
                if let Value::Int(v) = tuple.value(i) {
                    mins.entry(i)
                        .and_modify(|m| *m = (*m).min(*v))
                        .or_insert(*v);
                    maxs.entry(i)
                        .and_modify(|m| *m = (*m).max(*v))
                        .or_insert(*v);
                }
            }
        }
        let mut int_hists: HashMap<usize, IntHistogram> = mins
            .iter()
            .map(|(&i, &min)| (i, IntHistogram::new(NUM_HIST_BINS, min, maxs[&i])))
            .collect();

        // Second pass: load cell values into the histograms and count
        // distinct values.
        scan.rewind()?;
        while let Some(tuple) = scan.next()? {
            for i in 0..num_fields {
                match tuple.value(i) {
                    Value::Int(v) => {
                        if let Some(hist) = int_hists.get_mut(&i) {
                            hist.add_value(*v);
                        }
                    }
                    Value::Text(s) => {
                        text_hists
                            .entry(i)
                            .or_insert_with(|| TextHistogram::new(NUM_HIST_BINS))
                            .add_value(s);
                    }
                }
                if let Some(set) = seen.get_mut(&i) {
                    set.insert(tuple.value(i).clone());
                }
            }
        }
        scan.close();
        pool.transaction_complete(tid, true);

        let num_distinct = seen.into_iter().map(|(i, set)| (i, set.len())).collect();
        debug!("built stats for table {}: {} tuples", table_id, ntups);

        Ok(Self {
            table_id,
            file,
            io_cost_per_page,
            ntups,
            int_hists,
            text_hists,
            num_distinct,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Total number of tuples in the table at build time.
    pub fn total_tuples(&self) -> usize {
        self.ntups
    }

    /// Number of distinct values in a column. Panics on a bad field index.
    pub fn num_distinct(&self, field: usize) -> usize {
        self.num_distinct[&field]
    }

    /// Cost of sequentially scanning the whole file, charging full-page IO
    /// even for a nearly empty trailing page.
    pub fn estimate_scan_cost(&self) -> Result<f64, HeapFileError> {
        Ok((self.file.num_pages()? * self.io_cost_per_page) as f64)
    }

    /// Row count after applying a predicate with the given selectivity.
    pub fn estimate_cardinality(&self, selectivity: f64) -> usize {
        (self.ntups as f64 * selectivity).round() as usize
    }

    /// Selectivity of `field <op> constant` estimated from the column's
    /// histogram. Panics if the constant's type does not match the column.
    pub fn estimate_selectivity(&self, field: usize, op: CmpOp, constant: &Value) -> f64 {
        match constant {
            Value::Int(v) => match self.int_hists.get(&field) {
                Some(hist) => hist.estimate_selectivity(op, *v),
                None => panic!("field {} is not an integer column", field),
            },
            Value::Text(s) => match self.text_hists.get(&field) {
                Some(hist) => hist.estimate_selectivity(op, s),
                None => panic!("field {} is not a text column", field),
            },
        }
    }

    /// Average selectivity of the column under any operand, estimated from
    /// its histogram. Panics on a bad field index.
    pub fn avg_selectivity(&self, field: usize) -> f64 {
        if let Some(hist) = self.int_hists.get(&field) {
            hist.avg_selectivity()
        } else if let Some(hist) = self.text_hists.get(&field) {
            hist.avg_selectivity()
        } else {
            panic!("field {} has no histogram", field)
        }
    }
}
