//! Marshaling layer between application values and the wire type system.

pub mod accessor;
pub mod compat;
pub mod constants;
pub mod getter_setter;
pub mod lob;
pub mod normalize;
pub mod record_buffer;
pub mod structured;
pub mod types;
pub mod xet;

pub use compat::{can_access_getter_directly, can_access_setter_directly};
pub use getter_setter::{TypedGetterSetter, ValueGetters, ValueSetters};
pub use lob::{BlobReader, CharRead, CharReader};
pub use normalize::{FieldDescriptor, FieldKind, FieldValue, UdtLayout, UdtNormalizer};
pub use record_buffer::{RecordBuffer, TableBuffer};
pub use structured::{DataTable, DataTableReader, RowReader};
pub use types::{
    ColumnInfo, ColumnMetadata, DataRecord, SqlDecimal, SqlMoney, SqlValue, ValueKind, WireType,
};
pub use xet::check_xet_parameters;
