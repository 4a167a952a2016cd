//! Record type for row sequences written to structured columns.

use std::sync::Arc;

use crate::error::{Error, Result};

use super::column::ColumnInfo;
use super::metadata::ColumnMetadata;
use super::value::SqlValue;

/// A self-describing row: values plus the metadata of each field.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Field values.
    values: Vec<SqlValue>,
    /// Shared column information (reference counted).
    column_info: Arc<ColumnInfo>,
}

impl DataRecord {
    /// Create a record; the value count must match the column count.
    pub fn new(values: Vec<SqlValue>, column_info: Arc<ColumnInfo>) -> Result<Self> {
        if values.len() != column_info.len() {
            return Err(Error::invalid_argument(
                "values",
                format!(
                    "{} values supplied for {} columns",
                    values.len(),
                    column_info.len()
                ),
            ));
        }
        Ok(Self {
            values,
            column_info,
        })
    }

    /// Get value by field index (0-based).
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get value by field name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Get field metadata.
    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.column_info.columns
    }

    /// Get shared column information.
    pub fn column_info(&self) -> &Arc<ColumnInfo> {
        &self.column_info
    }

    /// Iterate over values.
    pub fn iter(&self) -> impl Iterator<Item = &SqlValue> {
        self.values.iter()
    }
}

impl IntoIterator for DataRecord {
    type Item = SqlValue;
    type IntoIter = std::vec::IntoIter<SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a DataRecord {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::WireType;

    fn make_test_column_info() -> Arc<ColumnInfo> {
        Arc::new(
            ColumnInfo::new(vec![
                ColumnMetadata::new_sized("NAME", WireType::NVarChar, 100).unwrap(),
                ColumnMetadata::new("VALUE", WireType::Int).unwrap(),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_record_access() {
        let record = DataRecord::new(
            vec![SqlValue::String("test".to_string()), SqlValue::I32(42)],
            make_test_column_info(),
        )
        .unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get(0), Some(&SqlValue::String("test".to_string())));
        assert_eq!(record.get_by_name("value"), Some(&SqlValue::I32(42)));
        assert_eq!(record.get_by_name("VALUE"), record.get_by_name("value"));
        assert_eq!(record.metadata()[1].wire_type(), WireType::Int);
        assert_eq!(record.iter().count(), 2);
    }

    #[test]
    fn test_record_value_count_must_match() {
        let result = DataRecord::new(vec![SqlValue::I32(1)], make_test_column_info());
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }
}
