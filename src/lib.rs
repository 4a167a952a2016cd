//! Value marshaling core for a SQL Server client
//!
//! Converts between application values and the server's wire type system:
//! per-type get/set access over a positional primitive, metadata
//! validation and adjustment, chunked large-object transfer, structured
//! (table-valued) transfers and order-preserving UDT normalization.
//!
//! # Example
//!
//! ```
//! use smi_marshal::protocol::accessor;
//! use smi_marshal::{ColumnMetadata, RecordBuffer, Result, SqlValue, WireType};
//!
//! fn main() -> Result<()> {
//!     let meta = ColumnMetadata::new_sized("name", WireType::NVarChar, 5)?;
//!     let mut row = RecordBuffer::new(vec![meta.clone()]);
//!
//!     // Strings longer than the column are truncated
//!     accessor::set_string(&mut row, 0, &meta, "truncated")?;
//!     assert_eq!(accessor::get_string(&mut row, 0, &meta)?, "trunc");
//!
//!     // Values are materialized according to the wire type
//!     let value = accessor::get_value(&mut row, 0, &meta)?;
//!     assert_eq!(value, SqlValue::String("trunc".to_string()));
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod options;
pub mod protocol;

// Re-export main types
pub use error::{Error, Result};
pub use options::MarshalOptions;
pub use protocol::types::{
    ColumnInfo, ColumnMetadata, CompareOptions, DataRecord, SortOrder, SqlDecimal, SqlMoney,
    SqlValue, UdtType, ValueKind, WireType, XmlSchemaCollection,
};
pub use protocol::{
    BlobReader, CharRead, CharReader, DataTable, RecordBuffer, RowReader, TableBuffer,
    TypedGetterSetter, UdtLayout, UdtNormalizer, ValueGetters, ValueSetters,
};
