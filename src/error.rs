//! Error types for the value marshaling core.

use std::io;
use thiserror::Error;

use crate::protocol::types::WireType;

/// Result type alias for marshaling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for marshaling operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error raised by a caller-supplied stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Null value read where a non-null value was required.
    #[error("Data is Null: ordinal {ordinal} cannot be read as a non-null value")]
    NullValue { ordinal: usize },

    /// Value kind cannot be read or written against the wire type.
    #[error("Invalid cast: {message}")]
    InvalidCast { message: String },

    /// Value out of range for the declared column shape.
    #[error("Invalid value for metadata of type {wire_type}: {message}")]
    InvalidMetadataValue { wire_type: WireType, message: String },

    /// A negative offset or length was supplied.
    #[error("Invalid value for '{parameter}': must not be negative")]
    NegativeParameter { parameter: &'static str },

    /// Destination buffer offset is negative or past the buffer end.
    #[error("Invalid destination buffer index {index} (buffer length {buffer_length})")]
    InvalidDestinationBufferIndex { index: i64, buffer_length: i64 },

    /// `length + buffer_offset` exceeds the buffer.
    #[error("Buffer of length {buffer_length} cannot hold {length} at offset {buffer_offset}")]
    InvalidBufferSizeOrIndex {
        length: i64,
        buffer_offset: i64,
        buffer_length: i64,
    },

    /// Requested length is negative.
    #[error("Invalid data length {length}")]
    InvalidDataLength { length: i64 },

    /// Byte-oriented access to a column that is not a binary large object.
    #[error("Column of type {wire_type} is not a blob column")]
    NonBlobColumn { wire_type: WireType },

    /// A row-sequence source changed its field count mid-stream.
    #[error("Row {row} has {actual} fields, expected {expected}")]
    FieldCountChanged {
        row: u64,
        expected: usize,
        actual: usize,
    },

    /// A row-sequence source changed a field's metadata mid-stream.
    #[error("Metadata for field '{field}' of row {row} does not match the first row")]
    FieldMetadataChanged { row: u64, field: String },

    /// Wire type passed to a constructor family that does not accept it.
    #[error("Wire type {wire_type} is not valid for the {constructor} constructor")]
    InvalidTypeForConstructor {
        wire_type: WireType,
        constructor: &'static str,
    },

    /// Invalid argument to a metadata constructor.
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    /// The runtime value kind has no wire type.
    #[error("Cannot infer a wire type from a {kind} value")]
    InvalidDataType { kind: &'static str },

    /// Money conversion overflowed.
    #[error("Arithmetic overflow converting {value} to money")]
    MoneyOverflow { value: String },

    /// Normalized key shorter than the layout it is decoded against.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Primitive operation not implemented by the transport.
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    /// Internal invariant violated. Always a defect.
    #[error("Internal invariant violated: {message}")]
    InternalInvariant { message: String },
}

impl Error {
    /// Create an invalid cast error.
    pub fn invalid_cast(message: impl Into<String>) -> Self {
        Self::InvalidCast {
            message: message.into(),
        }
    }

    /// Create an invalid metadata value error.
    pub fn invalid_value(wire_type: WireType, message: impl Into<String>) -> Self {
        Self::InvalidMetadataValue {
            wire_type,
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// Create an internal invariant error and log it.
    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "marshaling invariant violated");
        Self::InternalInvariant { message }
    }

    /// Whether this error is a length/offset validation failure.
    pub fn is_invalid_length(&self) -> bool {
        matches!(
            self,
            Error::NegativeParameter { .. }
                | Error::InvalidDestinationBufferIndex { .. }
                | Error::InvalidBufferSizeOrIndex { .. }
                | Error::InvalidDataLength { .. }
                | Error::NonBlobColumn { .. }
        )
    }

    /// Whether this error reports a row-sequence shape change.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Error::FieldCountChanged { .. } | Error::FieldMetadataChanged { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidDataLength { length: -1 }.is_invalid_length());
        assert!(Error::NegativeParameter {
            parameter: "fieldOffset"
        }
        .is_invalid_length());
        assert!(!Error::invalid_cast("x").is_invalid_length());

        let err = Error::FieldCountChanged {
            row: 3,
            expected: 2,
            actual: 3,
        };
        assert!(err.is_shape_mismatch());
        assert_eq!(err.to_string(), "Row 3 has 3 fields, expected 2");
    }

    #[test]
    fn test_invalid_value_message() {
        let err = Error::invalid_value(WireType::SmallMoney, "out of range");
        assert_eq!(
            err.to_string(),
            "Invalid value for metadata of type smallmoney: out of range"
        );
    }
}
