// Schema descriptors and the table registry.

pub mod catalog;
pub mod schema;
pub mod value;

pub use catalog::Catalog;
pub use schema::{Column, FieldType, Schema, TEXT_SIZE};
pub use value::Value;
