// In-memory image of one heap-file page.
//
// On disk a page is exactly page_size bytes: a header bitmap of
// ceil(slots / 8) bytes (bit i set means slot i is occupied, least
// significant bit first within each byte), followed by the slots, each
// tuple_size bytes, with any trailing bytes zero.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::error::PageError;
use super::free_list::FreeList;
use crate::catalog::schema::Schema;
use crate::common::types::{page_size, PageId};
use crate::storage::tuple::{RecordId, Tuple};
use crate::transaction::concurrency::{DeadlockDetector, PageLock};
use crate::transaction::TransactionId;

/// Number of tuple slots one page holds under the given schema.
pub fn slots_per_page(schema: &Schema) -> usize {
    (page_size() * 8) / (schema.byte_size() * 8 + 1)
}

/// Bytes in the slot-occupancy header.
pub fn header_size(schema: &Schema) -> usize {
    slots_per_page(schema).div_ceil(8)
}

struct PageBody {
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    free_slots: FreeList<usize>,
}

/// One cached page of a heap file. The logical lock serializes access by
/// transactions; the body lock below it only guards the in-memory structure
/// against torn reads.
pub struct HeapPage {
    pid: PageId,
    schema: Arc<Schema>,
    lock: Arc<PageLock>,
    dirtier: Mutex<Option<TransactionId>>,
    body: RwLock<PageBody>,
}

impl HeapPage {
    /// Deserialize a page from its on-disk bytes, creating its lock.
    pub fn from_bytes(
        pid: PageId,
        schema: Arc<Schema>,
        detector: &Arc<DeadlockDetector>,
        data: &[u8],
    ) -> Result<Self, PageError> {
        let num_slots = slots_per_page(&schema);
        let mut cursor = Cursor::new(data);
        let mut header = vec![0u8; header_size(&schema)];
        cursor.read_exact(&mut header)?;

        let mut tuples = Vec::with_capacity(num_slots);
        let mut free_slots = FreeList::new();
        for slot in 0..num_slots {
            if header[slot / 8] >> (slot % 8) & 1 == 1 {
                let mut tuple = Tuple::parse(&schema, &mut cursor)?;
                tuple.set_record_id(RecordId { pid, slot });
                tuples.push(Some(tuple));
            } else {
                cursor.seek(SeekFrom::Current(schema.byte_size() as i64))?;
                tuples.push(None);
                free_slots.append(slot);
            }
        }

        Ok(Self {
            pid,
            schema: schema.clone(),
            lock: PageLock::new(pid, detector),
            dirtier: Mutex::new(None),
            body: RwLock::new(PageBody {
                header,
                tuples,
                free_slots,
            }),
        })
    }

    /// All-zero image of a fresh empty page.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; page_size()]
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn pg_lock(&self) -> &Arc<PageLock> {
        &self.lock
    }

    /// Mark the page dirty on behalf of `tid`, or clean when `dirty` is
    /// false.
    pub fn mark_dirty(&self, dirty: bool, tid: TransactionId) {
        *self.dirtier.lock() = if dirty { Some(tid) } else { None };
    }

    /// Transaction that last dirtied this page, or None when clean.
    pub fn dirtier(&self) -> Option<TransactionId> {
        *self.dirtier.lock()
    }

    /// Serialize the current image back to exactly page_size bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PageError> {
        let body = self.body.read();
        let mut data = Vec::with_capacity(page_size());
        data.extend_from_slice(&body.header);
        let tuple_size = self.schema.byte_size();
        for slot in &body.tuples {
            match slot {
                Some(tuple) => tuple.serialize(&mut data)?,
                None => data.extend(std::iter::repeat(0u8).take(tuple_size)),
            }
        }
        data.resize(page_size(), 0);
        Ok(data)
    }

    /// Claim a free slot for the tuple and stamp its record id.
    pub fn insert_tuple(&self, mut tuple: Tuple) -> Result<RecordId, PageError> {
        if tuple.schema().as_ref() != self.schema.as_ref() {
            return Err(PageError::SchemaMismatch);
        }
        let mut body = self.body.write();
        let Some(slot) = body.free_slots.pop() else {
            return Err(PageError::PageFull);
        };
        body.header[slot / 8] |= 1 << (slot % 8);
        let rid = RecordId {
            pid: self.pid,
            slot,
        };
        tuple.set_record_id(rid);
        body.tuples[slot] = Some(tuple);
        Ok(rid)
    }

    /// Clear the tuple's slot; the header bit is the source of truth.
    pub fn delete_tuple(&self, tuple: &Tuple) -> Result<(), PageError> {
        let rid = tuple.record_id().ok_or(PageError::TupleNotOnPage)?;
        if rid.pid != self.pid {
            return Err(PageError::TupleNotOnPage);
        }
        let mut body = self.body.write();
        if body.header[rid.slot / 8] >> (rid.slot % 8) & 1 == 0 {
            return Err(PageError::SlotEmpty(rid.slot));
        }
        body.header[rid.slot / 8] &= !(1 << (rid.slot % 8));
        body.tuples[rid.slot] = None;
        body.free_slots.append(rid.slot);
        Ok(())
    }

    pub fn num_slots(&self) -> usize {
        slots_per_page(&self.schema)
    }

    /// Number of empty slots remaining on this page.
    pub fn unused_slots(&self) -> usize {
        self.body.read().free_slots.len()
    }

    pub fn slot_used(&self, slot: usize) -> bool {
        self.body.read().header[slot / 8] >> (slot % 8) & 1 == 1
    }

    /// Snapshot of the occupied tuples in slot order.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.body.read().tuples.iter().flatten().cloned().collect()
    }
}
