#![forbid(unsafe_code)]

use super::{check_monotonic, offset, Validity};
use crate::buffer::Buffer;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::types::{DataType, IndexType};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Variable-length string builder: `i32` offsets plus a UTF-8 byte region.
///
/// Numbers and bigints are stored as their text form.
pub struct Utf8Builder {
    offsets: Vec<i32>,
    data: Vec<u8>,
    validity: Validity,
}

impl Utf8Builder {
    pub fn new(expected_len: usize, nullable: bool) -> Self {
        let mut offsets = Vec::with_capacity(expected_len + 1);
        offsets.push(0);
        Self {
            offsets,
            data: Vec::new(),
            validity: Validity::new(nullable, expected_len),
        }
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        check_monotonic(index, self.len())?;
        while self.len() < index {
            self.push(None)?;
        }
        match value {
            Value::Null => self.push(None),
            Value::String(s) => self.push(Some(s.as_ref())),
            other => match other.to_text() {
                Some(text) => self.push(Some(text.as_str())),
                None => Err(EncodeError::conflict(&DataType::Utf8, other.kind())),
            },
        }
    }

    fn push(&mut self, text: Option<&str>) -> EncodeResult<()> {
        let row = self.len();
        self.validity.set(row, text.is_some())?;
        if let Some(text) = text {
            self.data.extend_from_slice(text.as_bytes());
        }
        self.offsets.push(offset(self.data.len())?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn finish(self) -> ArrayData {
        let len = self.len();
        let (null_count, validity) = self.validity.finish(len);
        ArrayData::new(
            DataType::Utf8,
            len,
            null_count,
            validity,
            vec![Buffer::from_slice(&self.offsets), Buffer::from_vec(self.data)],
        )
    }
}

/// Dictionary-encoded string builder.
///
/// Distinct strings are numbered in first-seen order. Codes are buffered as
/// `u32` and narrowed on finish to the smallest index width that addresses
/// every distinct value.
pub struct DictionaryBuilder {
    max_index: IndexType,
    dictionary: Vec<Arc<str>>,
    dict_map: HashMap<Arc<str>, u32>,
    codes: Vec<u32>,
    validity: Validity,
}

impl DictionaryBuilder {
    pub fn new(max_index: IndexType, expected_len: usize, nullable: bool) -> Self {
        Self {
            max_index,
            dictionary: Vec::new(),
            dict_map: HashMap::new(),
            codes: Vec::with_capacity(expected_len),
            validity: Validity::new(nullable, expected_len),
        }
    }

    fn intern(&mut self, s: Arc<str>) -> EncodeResult<u32> {
        if let Some(idx) = self.dict_map.get(s.as_ref()) {
            return Ok(*idx);
        }

        let distinct = self.dictionary.len() + 1;
        let limit = self.max_index.capacity().min(u32::MAX as u64);
        if distinct as u64 > limit {
            return Err(EncodeError::DictionaryOverflow {
                index_type: self.max_index,
                distinct,
            });
        }

        let idx = self.dictionary.len() as u32;
        self.dictionary.push(s.clone());
        self.dict_map.insert(s, idx);
        Ok(idx)
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        check_monotonic(index, self.len())?;
        while self.len() < index {
            self.push(None)?;
        }
        let code = match value {
            Value::Null => None,
            Value::String(s) => Some(self.intern(s.clone())?),
            other => match other.to_text() {
                Some(text) => Some(self.intern(Arc::from(text))?),
                None => {
                    return Err(EncodeError::conflict(
                        &DataType::Dictionary(self.max_index),
                        other.kind(),
                    ))
                }
            },
        };
        self.push(code)
    }

    fn push(&mut self, code: Option<u32>) -> EncodeResult<()> {
        self.validity.set(self.codes.len(), code.is_some())?;
        self.codes.push(code.unwrap_or(0));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn distinct_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn finish(self) -> EncodeResult<ArrayData> {
        let index_type = IndexType::smallest_for(self.dictionary.len());
        if index_type > self.max_index {
            return Err(EncodeError::DictionaryOverflow {
                index_type: self.max_index,
                distinct: self.dictionary.len(),
            });
        }

        let codes = match index_type {
            IndexType::Int8 => {
                Buffer::from_slice(&self.codes.iter().map(|c| *c as i8).collect::<Vec<_>>())
            }
            IndexType::Int16 => {
                Buffer::from_slice(&self.codes.iter().map(|c| *c as i16).collect::<Vec<_>>())
            }
            IndexType::Int32 => {
                Buffer::from_slice(&self.codes.iter().map(|c| *c as i32).collect::<Vec<_>>())
            }
            IndexType::Int64 => {
                Buffer::from_slice(&self.codes.iter().map(|c| *c as i64).collect::<Vec<_>>())
            }
        };

        let mut values = Utf8Builder::new(self.dictionary.len(), false);
        for (idx, s) in self.dictionary.iter().enumerate() {
            values.set(&Value::String(s.clone()), idx)?;
        }

        let len = self.codes.len();
        let (null_count, validity) = self.validity.finish(len);
        Ok(ArrayData::new(
            DataType::Dictionary(index_type),
            len,
            null_count,
            validity,
            vec![codes],
        )
        .with_dictionary(values.finish()))
    }
}
