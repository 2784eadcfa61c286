// Field values and their fixed on-disk encodings.

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::schema::{FieldType, TEXT_SIZE};

/// A single field value inside a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Text(_) => FieldType::Text,
        }
    }

    /// Serialize with the fixed layout: ints are 4-byte big-endian, text is
    /// a 4-byte length followed by TEXT_SIZE content bytes, zero padded.
    /// Text longer than TEXT_SIZE is truncated.
    pub fn serialize<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Value::Int(v) => w.write_i32::<BigEndian>(*v),
            Value::Text(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(TEXT_SIZE);
                w.write_u32::<BigEndian>(len as u32)?;
                w.write_all(&bytes[..len])?;
                w.write_all(&vec![0u8; TEXT_SIZE - len])
            }
        }
    }

    /// Parse one value of the given type from its fixed layout.
    pub fn parse<R: Read>(field_type: FieldType, r: &mut R) -> io::Result<Value> {
        match field_type {
            FieldType::Int => Ok(Value::Int(r.read_i32::<BigEndian>()?)),
            FieldType::Text => {
                let len = r.read_u32::<BigEndian>()? as usize;
                let mut buf = vec![0u8; TEXT_SIZE];
                r.read_exact(&mut buf)?;
                let len = len.min(TEXT_SIZE);
                Ok(Value::Text(
                    String::from_utf8_lossy(&buf[..len]).into_owned(),
                ))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
