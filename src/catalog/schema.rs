// Schema descriptors for fixed-layout tuples.

use std::hash::{Hash, Hasher};

/// Fixed number of content bytes in a serialized text field.
pub const TEXT_SIZE: usize = 128;

/// Type of a single tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// On-disk size of one value of this type, in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => TEXT_SIZE + 4,
        }
    }
}

/// One column of a schema. The name is cosmetic and optional.
#[derive(Debug, Clone)]
pub struct Column {
    pub field_type: FieldType,
    pub name: Option<String>,
}

/// Ordered field layout of a table's tuples.
///
/// Equality and hashing consider field types only, so two schemas with the
/// same layout compare equal regardless of column names.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(types: Vec<FieldType>) -> Self {
        Self {
            columns: types
                .into_iter()
                .map(|field_type| Column {
                    field_type,
                    name: None,
                })
                .collect(),
        }
    }

    /// Panics if the name list length differs from the type list length.
    pub fn with_names(types: Vec<FieldType>, names: Vec<&str>) -> Self {
        assert_eq!(types.len(), names.len(), "one name per field required");
        Self {
            columns: types
                .into_iter()
                .zip(names)
                .map(|(field_type, name)| Column {
                    field_type,
                    name: Some(name.to_string()),
                })
                .collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    /// Panics on an out-of-range index; a bad field index is a programmer
    /// error.
    pub fn field_type(&self, i: usize) -> FieldType {
        self.columns[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.columns[i].name.as_deref()
    }

    /// Index of the first column with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.as_deref() == Some(name))
    }

    /// Total serialized size of one tuple, in bytes.
    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(|c| c.field_type.byte_size()).sum()
    }

    /// Concatenate two schemas into the layout of a joined tuple.
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let mut columns = a.columns.clone();
        columns.extend(b.columns.iter().cloned());
        Schema { columns }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for column in &self.columns {
            column.field_type.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(schema: &Schema) -> u64 {
        let mut hasher = DefaultHasher::new();
        schema.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_names() {
        let a = Schema::new(vec![FieldType::Int, FieldType::Text]);
        let b = Schema::with_names(vec![FieldType::Int, FieldType::Text], vec!["id", "name"]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_merge_concatenates() {
        let a = Schema::new(vec![FieldType::Int]);
        let b = Schema::new(vec![FieldType::Text, FieldType::Int]);
        let merged = Schema::merge(&a, &b);
        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_type(0), FieldType::Int);
        assert_eq!(merged.field_type(1), FieldType::Text);
        assert_eq!(merged.byte_size(), a.byte_size() + b.byte_size());
    }

    #[test]
    fn test_field_index_by_name() {
        let schema = Schema::with_names(vec![FieldType::Int, FieldType::Int], vec!["a", "b"]);
        assert_eq!(schema.field_index("b"), Some(1));
        assert_eq!(schema.field_index("missing"), None);
    }
}
