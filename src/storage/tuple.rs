// Tuples and their record identities.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::catalog::value::Value;
use crate::common::types::PageId;

/// Stable location of a stored tuple: its page and slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub pid: PageId,
    pub slot: usize,
}

/// One row of a table, laid out per its schema. A tuple carries a record id
/// only while it is stored on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Panics if the values do not match the schema in count or type.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        assert_eq!(
            schema.num_fields(),
            values.len(),
            "tuple arity does not match its schema"
        );
        for (i, value) in values.iter().enumerate() {
            assert_eq!(
                schema.field_type(i),
                value.field_type(),
                "field {} type does not match its schema",
                i
            );
        }
        Self {
            schema,
            values,
            record_id: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Panics on an out-of-range index.
    pub fn value(&self, i: usize) -> &Value {
        &self.values[i]
    }

    pub fn set_value(&mut self, i: usize, value: Value) {
        assert_eq!(
            self.schema.field_type(i),
            value.field_type(),
            "field {} type does not match its schema",
            i
        );
        self.values[i] = value;
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    /// Serialize every field in order with the fixed layout.
    pub fn serialize<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for value in &self.values {
            value.serialize(w)?;
        }
        Ok(())
    }

    /// Parse one tuple of the given schema.
    pub fn parse<R: Read>(schema: &Arc<Schema>, r: &mut R) -> io::Result<Tuple> {
        let mut values = Vec::with_capacity(schema.num_fields());
        for i in 0..schema.num_fields() {
            values.push(Value::parse(schema.field_type(i), r)?);
        }
        Ok(Tuple {
            schema: schema.clone(),
            values,
            record_id: None,
        })
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.values {
            if !first {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        Ok(())
    }
}
