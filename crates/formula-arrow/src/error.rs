use crate::types::{DataType, IndexType};
use crate::value::ValueKind;

pub type EncodeResult<T> = Result<T, EncodeError>;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("unsupported input data type: {0}")]
    UnsupportedInputType(String),

    #[error("column length mismatch for {column}: expected {expected} rows, got {actual}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("type conflict: cannot store {found} value as {expected}")]
    TypeConflict { expected: String, found: ValueKind },

    #[error("integer value {value} is outside the 64-bit range")]
    RangeOverflow { value: i128 },

    #[error("null value at row {index} in a non-nullable column")]
    NullNotAllowed { index: usize },

    #[error("nested values require an explicit list or struct type")]
    NestedTypeRequired,

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("unknown type name: {0}")]
    UnknownTypeName(String),

    #[error("out of order write at row {index}; next writable row is {next}")]
    OutOfOrderWrite { index: usize, next: usize },

    #[error("dictionary with {distinct} distinct values does not fit {index_type} codes")]
    DictionaryOverflow {
        index_type: IndexType,
        distinct: usize,
    },

    #[cfg(feature = "arrow")]
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl EncodeError {
    pub(crate) fn conflict(expected: &DataType, found: ValueKind) -> Self {
        Self::TypeConflict {
            expected: expected.to_string(),
            found,
        }
    }
}
