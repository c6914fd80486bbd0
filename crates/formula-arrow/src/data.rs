#![forbid(unsafe_code)]

use crate::buffer::Buffer;
use crate::types::DataType;

/// Finished physical buffers for one column (or one nested child).
///
/// Buffer layout by type:
/// - `Null`: no buffers
/// - `Boolean`: `[bits]`
/// - fixed-width numbers: `[values]`
/// - `Utf8`: `[offsets (i32, len + 1), bytes]`
/// - `Dictionary`: `[codes]`, distinct values in [`ArrayData::dictionary`]
/// - `List`: `[offsets (i32, len + 1)]` plus one child
/// - `Struct`: no buffers, one child per field
///
/// The validity bitmap is only materialized when the column contains nulls.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayData {
    data_type: DataType,
    len: usize,
    null_count: usize,
    validity: Option<Buffer>,
    buffers: Vec<Buffer>,
    children: Vec<ArrayData>,
    dictionary: Option<Box<ArrayData>>,
}

impl ArrayData {
    pub(crate) fn new(
        data_type: DataType,
        len: usize,
        null_count: usize,
        validity: Option<Buffer>,
        buffers: Vec<Buffer>,
    ) -> Self {
        Self {
            data_type,
            len,
            null_count,
            validity,
            buffers,
            children: Vec::new(),
            dictionary: None,
        }
    }

    pub(crate) fn with_children(mut self, children: Vec<ArrayData>) -> Self {
        self.children = children;
        self
    }

    pub(crate) fn with_dictionary(mut self, dictionary: ArrayData) -> Self {
        self.dictionary = Some(Box::new(dictionary));
        self
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> Option<&Buffer> {
        self.validity.as_ref()
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn children(&self) -> &[ArrayData] {
        &self.children
    }

    pub fn dictionary(&self) -> Option<&ArrayData> {
        self.dictionary.as_deref()
    }

    pub fn is_valid(&self, index: usize) -> bool {
        match &self.validity {
            Some(bits) => bits
                .as_slice()
                .get(index / 8)
                .is_some_and(|b| (b >> (index % 8)) & 1 == 1),
            None => index < self.len && self.data_type != DataType::Null,
        }
    }

    /// Total bytes across every physical region, including children.
    pub fn buffer_size_bytes(&self) -> usize {
        let own: usize = self.buffers.iter().map(Buffer::len).sum::<usize>()
            + self.validity.as_ref().map(Buffer::len).unwrap_or(0);
        let children: usize = self.children.iter().map(ArrayData::buffer_size_bytes).sum();
        let dict = self
            .dictionary
            .as_ref()
            .map(|d| d.buffer_size_bytes())
            .unwrap_or(0);
        own + children + dict
    }
}
