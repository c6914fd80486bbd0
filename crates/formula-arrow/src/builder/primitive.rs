#![forbid(unsafe_code)]

use super::Validity;
use crate::bitmap::BitVec;
use crate::buffer::{Buffer, NativeType};
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::types::DataType;
use crate::value::Value;

/// Builder for all-null columns: no buffers, only a length.
#[derive(Debug, Default)]
pub struct NullBuilder {
    len: usize,
}

impl NullBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        if !value.is_null() {
            return Err(EncodeError::conflict(&DataType::Null, value.kind()));
        }
        self.len = self.len.max(index + 1);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn finish(self) -> ArrayData {
        ArrayData::new(DataType::Null, self.len, self.len, None, Vec::new())
    }
}

/// Bit-packed boolean builder.
pub struct BooleanBuilder {
    values: BitVec,
    validity: Validity,
    len: usize,
}

impl BooleanBuilder {
    pub fn new(expected_len: usize, nullable: bool) -> Self {
        Self {
            values: BitVec::with_len_all_false(expected_len),
            validity: Validity::new(nullable, expected_len),
            len: 0,
        }
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        let bit = match value {
            Value::Null => None,
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0 && !n.is_nan()),
            Value::BigInt(n) => Some(*n != 0),
            other => return Err(EncodeError::conflict(&DataType::Boolean, other.kind())),
        };
        self.validity.set(index, bit.is_some())?;
        if index >= self.values.len() {
            self.values.resize(index + 1, false);
        }
        self.values.set(index, bit.unwrap_or(false));
        self.len = self.len.max(index + 1);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn finish(mut self) -> ArrayData {
        self.values.resize(self.len, false);
        let (null_count, validity) = self.validity.finish(self.len);
        ArrayData::new(
            DataType::Boolean,
            self.len,
            null_count,
            validity,
            vec![self.values.to_buffer()],
        )
    }
}

/// Numeric scalar a [`PrimitiveBuilder`] can store.
///
/// Conversions use `as` casts: the profiler has already established that
/// observed values fit the resolved width.
pub trait PrimitiveValue: NativeType {
    fn from_f64(v: f64) -> Self;
    fn from_i128(v: i128) -> Self;
}

macro_rules! impl_primitive_value {
    ($($t:ty),*) => {
        $(impl PrimitiveValue for $t {
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn from_i128(v: i128) -> Self {
                v as $t
            }
        })*
    };
}

impl_primitive_value!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Fixed-stride numeric builder with random-access writes.
pub struct PrimitiveBuilder<T: PrimitiveValue> {
    data_type: DataType,
    values: Vec<T>,
    validity: Validity,
    len: usize,
}

impl<T: PrimitiveValue> PrimitiveBuilder<T> {
    pub fn new(data_type: DataType, expected_len: usize, nullable: bool) -> Self {
        Self {
            data_type,
            values: vec![T::default(); expected_len],
            validity: Validity::new(nullable, expected_len),
            len: 0,
        }
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        let v = match value {
            Value::Null => None,
            Value::Number(n) => Some(T::from_f64(*n)),
            Value::BigInt(n) => Some(T::from_i128(*n)),
            Value::Boolean(b) => Some(T::from_f64(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => Some(T::from_f64(n)),
                Err(_) => return Err(EncodeError::conflict(&self.data_type, value.kind())),
            },
            Value::List(_) | Value::Struct(_) => {
                return Err(EncodeError::conflict(&self.data_type, value.kind()))
            }
        };
        self.validity.set(index, v.is_some())?;
        if index >= self.values.len() {
            self.values.resize(index + 1, T::default());
        }
        self.values[index] = v.unwrap_or_default();
        self.len = self.len.max(index + 1);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn finish(self) -> ArrayData {
        let values = Buffer::from_slice(&self.values[..self.len]);
        let (null_count, validity) = self.validity.finish(self.len);
        ArrayData::new(self.data_type, self.len, null_count, validity, vec![values])
    }
}
