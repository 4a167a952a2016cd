//! Shared column information for records.

use crate::error::{Error, Result};

use super::metadata::ColumnMetadata;

/// Column metadata shared by every record of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<ColumnMetadata>,
}

impl ColumnInfo {
    /// Create column info, rejecting duplicate names (case-insensitive).
    pub fn new(columns: Vec<ColumnMetadata>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            let clash = columns[..i]
                .iter()
                .any(|c| c.name().eq_ignore_ascii_case(column.name()));
            if clash {
                return Err(Error::invalid_argument(
                    "columns",
                    format!("duplicate column name '{}'", column.name()),
                ));
            }
        }
        Ok(Self { columns })
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&ColumnMetadata> {
        self.columns.get(index)
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::WireType;

    fn make_test_metadata() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("ID", WireType::Int).unwrap(),
            ColumnMetadata::new_sized("NAME", WireType::NVarChar, 100).unwrap(),
        ]
    }

    #[test]
    fn test_column_info_lookup() {
        let info = ColumnInfo::new(make_test_metadata()).unwrap();

        assert_eq!(info.len(), 2);
        assert_eq!(info.column_names(), vec!["ID", "NAME"]);
        assert_eq!(info.find_by_name("name"), Some(1));
        assert_eq!(info.find_by_name("UNKNOWN"), None);
        assert_eq!(info.get(1).map(|c| c.max_length()), Some(100));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut columns = make_test_metadata();
        columns.push(ColumnMetadata::new("id", WireType::BigInt).unwrap());
        match ColumnInfo::new(columns) {
            Err(Error::InvalidArgument { argument, .. }) => assert_eq!(argument, "columns"),
            _ => panic!("Expected InvalidArgument error"),
        }
    }
}
