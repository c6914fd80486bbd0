//! Per-type column builders.
//!
//! A builder is created once per column, receives one `set(value, index)` call
//! per output row and is finished exactly once into an [`ArrayData`].
//! Fixed-width builders accept rows in any order; variable-length, dictionary
//! and nested builders require non-decreasing indices (skipped rows are null).

#![forbid(unsafe_code)]

mod nested;
mod primitive;
mod utf8;

use crate::bitmap::BitVec;
use crate::buffer::Buffer;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::types::DataType;
use crate::value::Value;

pub use nested::{ListBuilder, StructBuilder};
pub use primitive::{BooleanBuilder, NullBuilder, PrimitiveBuilder, PrimitiveValue};
pub use utf8::{DictionaryBuilder, Utf8Builder};

pub enum ArrayBuilder {
    Null(NullBuilder),
    Boolean(BooleanBuilder),
    Int8(PrimitiveBuilder<i8>),
    Int16(PrimitiveBuilder<i16>),
    Int32(PrimitiveBuilder<i32>),
    Int64(PrimitiveBuilder<i64>),
    UInt8(PrimitiveBuilder<u8>),
    UInt16(PrimitiveBuilder<u16>),
    UInt32(PrimitiveBuilder<u32>),
    UInt64(PrimitiveBuilder<u64>),
    Float32(PrimitiveBuilder<f32>),
    Float64(PrimitiveBuilder<f64>),
    Utf8(Utf8Builder),
    Dictionary(DictionaryBuilder),
    List(ListBuilder),
    Struct(StructBuilder),
}

/// Create the builder for `data_type`, pre-sized for `expected_len` rows.
pub fn builder(data_type: &DataType, expected_len: usize, nullable: bool) -> ArrayBuilder {
    match data_type {
        DataType::Null => ArrayBuilder::Null(NullBuilder::new()),
        DataType::Boolean => ArrayBuilder::Boolean(BooleanBuilder::new(expected_len, nullable)),
        DataType::Int8 => ArrayBuilder::Int8(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Int16 => ArrayBuilder::Int16(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Int32 => ArrayBuilder::Int32(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Int64 => ArrayBuilder::Int64(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::UInt8 => ArrayBuilder::UInt8(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::UInt16 => ArrayBuilder::UInt16(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::UInt32 => ArrayBuilder::UInt32(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::UInt64 => ArrayBuilder::UInt64(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Float32 => ArrayBuilder::Float32(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Float64 => ArrayBuilder::Float64(PrimitiveBuilder::new(data_type.clone(), expected_len, nullable)),
        DataType::Utf8 => ArrayBuilder::Utf8(Utf8Builder::new(expected_len, nullable)),
        DataType::Dictionary(index) => {
            ArrayBuilder::Dictionary(DictionaryBuilder::new(*index, expected_len, nullable))
        }
        DataType::List(item) => {
            ArrayBuilder::List(ListBuilder::new((**item).clone(), expected_len, nullable))
        }
        DataType::Struct(fields) => {
            ArrayBuilder::Struct(StructBuilder::new(fields.clone(), expected_len, nullable))
        }
    }
}

impl ArrayBuilder {
    /// Write the logical row at `index`.
    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        match self {
            ArrayBuilder::Null(b) => b.set(value, index),
            ArrayBuilder::Boolean(b) => b.set(value, index),
            ArrayBuilder::Int8(b) => b.set(value, index),
            ArrayBuilder::Int16(b) => b.set(value, index),
            ArrayBuilder::Int32(b) => b.set(value, index),
            ArrayBuilder::Int64(b) => b.set(value, index),
            ArrayBuilder::UInt8(b) => b.set(value, index),
            ArrayBuilder::UInt16(b) => b.set(value, index),
            ArrayBuilder::UInt32(b) => b.set(value, index),
            ArrayBuilder::UInt64(b) => b.set(value, index),
            ArrayBuilder::Float32(b) => b.set(value, index),
            ArrayBuilder::Float64(b) => b.set(value, index),
            ArrayBuilder::Utf8(b) => b.set(value, index),
            ArrayBuilder::Dictionary(b) => b.set(value, index),
            ArrayBuilder::List(b) => b.set(value, index),
            ArrayBuilder::Struct(b) => b.set(value, index),
        }
    }

    /// Number of rows written so far (highest index + 1).
    pub fn len(&self) -> usize {
        match self {
            ArrayBuilder::Null(b) => b.len(),
            ArrayBuilder::Boolean(b) => b.len(),
            ArrayBuilder::Int8(b) => b.len(),
            ArrayBuilder::Int16(b) => b.len(),
            ArrayBuilder::Int32(b) => b.len(),
            ArrayBuilder::Int64(b) => b.len(),
            ArrayBuilder::UInt8(b) => b.len(),
            ArrayBuilder::UInt16(b) => b.len(),
            ArrayBuilder::UInt32(b) => b.len(),
            ArrayBuilder::UInt64(b) => b.len(),
            ArrayBuilder::Float32(b) => b.len(),
            ArrayBuilder::Float64(b) => b.len(),
            ArrayBuilder::Utf8(b) => b.len(),
            ArrayBuilder::Dictionary(b) => b.len(),
            ArrayBuilder::List(b) => b.len(),
            ArrayBuilder::Struct(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze the accumulated rows into padded buffers.
    pub fn finish(self) -> EncodeResult<ArrayData> {
        match self {
            ArrayBuilder::Null(b) => Ok(b.finish()),
            ArrayBuilder::Boolean(b) => Ok(b.finish()),
            ArrayBuilder::Int8(b) => Ok(b.finish()),
            ArrayBuilder::Int16(b) => Ok(b.finish()),
            ArrayBuilder::Int32(b) => Ok(b.finish()),
            ArrayBuilder::Int64(b) => Ok(b.finish()),
            ArrayBuilder::UInt8(b) => Ok(b.finish()),
            ArrayBuilder::UInt16(b) => Ok(b.finish()),
            ArrayBuilder::UInt32(b) => Ok(b.finish()),
            ArrayBuilder::UInt64(b) => Ok(b.finish()),
            ArrayBuilder::Float32(b) => Ok(b.finish()),
            ArrayBuilder::Float64(b) => Ok(b.finish()),
            ArrayBuilder::Utf8(b) => Ok(b.finish()),
            ArrayBuilder::Dictionary(b) => b.finish(),
            ArrayBuilder::List(b) => b.finish(),
            ArrayBuilder::Struct(b) => b.finish(),
        }
    }
}

/// Validity tracking shared by all builders.
///
/// Non-nullable builders keep no bitmap and reject nulls outright.
pub(crate) struct Validity {
    nullable: bool,
    bits: BitVec,
}

impl Validity {
    pub(crate) fn new(nullable: bool, expected_len: usize) -> Self {
        let bits = if nullable {
            BitVec::with_len_all_true(expected_len)
        } else {
            BitVec::new()
        };
        Self { nullable, bits }
    }

    pub(crate) fn set(&mut self, index: usize, valid: bool) -> EncodeResult<()> {
        if !self.nullable {
            return if valid {
                Ok(())
            } else {
                Err(EncodeError::NullNotAllowed { index })
            };
        }
        if index >= self.bits.len() {
            self.bits.resize(index + 1, true);
        }
        self.bits.set(index, valid);
        Ok(())
    }

    /// `(null_count, bitmap)`; the bitmap is omitted when every row is valid.
    pub(crate) fn finish(mut self, len: usize) -> (usize, Option<Buffer>) {
        if !self.nullable {
            return (0, None);
        }
        self.bits.resize(len, true);
        match self.bits.count_zeros() {
            0 => (0, None),
            nulls => (nulls, Some(self.bits.to_buffer())),
        }
    }
}

/// Reject writes behind the cursor of an append-only builder.
pub(crate) fn check_monotonic(index: usize, next: usize) -> EncodeResult<()> {
    if index < next {
        return Err(EncodeError::OutOfOrderWrite { index, next });
    }
    Ok(())
}

/// Convert a byte or element count into an `i32` offset.
pub(crate) fn offset(len: usize) -> EncodeResult<i32> {
    i32::try_from(len).map_err(|_| EncodeError::RangeOverflow { value: len as i128 })
}
