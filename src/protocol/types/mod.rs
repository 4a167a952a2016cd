//! Value model: wire types, metadata, runtime values and records.

mod column;
mod decimal;
mod metadata;
mod row;
mod value;
mod wire_type;

pub use column::ColumnInfo;
pub use decimal::{SqlDecimal, SqlMoney};
pub use metadata::{
    infer_scale_from_ticks, ticks_to_time_delta, time_delta_ticks, ColumnMetadata, SortOrder,
    UdtType, XmlSchemaCollection, DEFAULT_SORT_ORDINAL,
};
pub(crate) use metadata::{verify_datetime_range, verify_time_range};
pub use row::DataRecord;
pub use value::{SqlValue, ValueKind};
pub use wire_type::{CompareOptions, WireType, WireTypeInfo};
