#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::buffer::Buffer;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::types::DataType;
use crate::value::{Record, Value};

/// Tabular input consumed by the encoder.
///
/// The encoder relies on this trait to:
/// - discover row count and column names
/// - look up a column's values by storage row
/// - walk storage rows in output order, honoring any filter/order view
///
/// Implementations must not be mutated while an encode call is running.
pub trait SourceTable: Sync {
    /// Number of logical rows (after filtering).
    fn row_count(&self) -> usize;

    fn column_names(&self) -> Vec<String>;

    fn column(&self, name: &str) -> Option<Box<dyn SourceColumn + '_>>;

    fn is_filtered(&self) -> bool {
        false
    }

    fn is_ordered(&self) -> bool {
        false
    }

    /// Visit storage row ids in output order, skipping `offset` logical rows
    /// and stopping after `limit`. `ordered = false` permits storage order.
    fn scan(
        &self,
        visit: &mut dyn FnMut(usize) -> EncodeResult<()>,
        ordered: bool,
        limit: usize,
        offset: usize,
    ) -> EncodeResult<()>;
}

/// One column of a [`SourceTable`].
pub trait SourceColumn {
    /// Value at a storage row id.
    fn get(&self, row: usize) -> Value;

    /// Backing storage, when it is a contiguous region in storage order.
    fn storage(&self) -> ColumnStorage<'_> {
        ColumnStorage::Opaque
    }

    /// Already-encoded buffers holding this column's values in storage order.
    fn encoded(&self) -> Option<&ArrayData> {
        None
    }
}

impl<T: SourceColumn + ?Sized> SourceColumn for &T {
    fn get(&self, row: usize) -> Value {
        (**self).get(row)
    }

    fn storage(&self) -> ColumnStorage<'_> {
        (**self).storage()
    }

    fn encoded(&self) -> Option<&ArrayData> {
        (**self).encoded()
    }
}

/// How a column's values are physically held by the source.
#[derive(Clone, Copy, Debug)]
pub enum ColumnStorage<'a> {
    /// A contiguous run of dynamic values.
    Values(&'a [Value]),
    /// A homogeneous fixed-width region, optionally with a null channel.
    Typed {
        values: TypedSlice<'a>,
        validity: Option<&'a BitVec>,
    },
    /// Values are only reachable through [`SourceColumn::get`].
    Opaque,
}

macro_rules! typed_storage {
    ($(($variant:ident, $t:ty, $dt:ident, $conv:ident)),* $(,)?) => {
        /// Owned homogeneous numeric storage.
        #[derive(Clone, Debug, PartialEq)]
        pub enum TypedValues {
            $($variant(Vec<$t>),)*
        }

        /// Borrowed view of [`TypedValues`].
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub enum TypedSlice<'a> {
            $($variant(&'a [$t]),)*
        }

        impl TypedValues {
            pub fn as_slice(&self) -> TypedSlice<'_> {
                match self {
                    $(TypedValues::$variant(v) => TypedSlice::$variant(v),)*
                }
            }

            pub fn len(&self) -> usize {
                self.as_slice().len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }

        impl<'a> TypedSlice<'a> {
            pub fn len(&self) -> usize {
                match self {
                    $(TypedSlice::$variant(v) => v.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// The column type this storage encodes to natively.
            pub fn data_type(&self) -> DataType {
                match self {
                    $(TypedSlice::$variant(_) => DataType::$dt,)*
                }
            }

            pub fn value(&self, index: usize) -> Value {
                match self {
                    $(TypedSlice::$variant(v) => v
                        .get(index)
                        .map(|x| $conv(*x))
                        .unwrap_or(Value::Null),)*
                }
            }

            /// Copy the region into a padded buffer.
            pub fn to_buffer(&self) -> Buffer {
                match self {
                    $(TypedSlice::$variant(v) => Buffer::from_slice(v),)*
                }
            }

            /// Copy the region, zeroing the slots marked null in `validity`.
            ///
            /// `validity` must cover at least `self.len()` bits.
            pub fn to_masked_buffer(&self, validity: &BitVec) -> Buffer {
                match self {
                    $(TypedSlice::$variant(v) => Buffer::from_slice_masked(v, validity),)*
                }
            }
        }

        $(impl From<Vec<$t>> for TypedValues {
            fn from(v: Vec<$t>) -> Self {
                TypedValues::$variant(v)
            }
        })*
    };
}

fn number<T: Into<f64>>(v: T) -> Value {
    Value::Number(v.into())
}

fn bigint<T: Into<i128>>(v: T) -> Value {
    Value::BigInt(v.into())
}

typed_storage!(
    (Int8, i8, Int8, number),
    (Int16, i16, Int16, number),
    (Int32, i32, Int32, number),
    (Int64, i64, Int64, bigint),
    (UInt8, u8, UInt8, number),
    (UInt16, u16, UInt16, number),
    (UInt32, u32, UInt32, number),
    (UInt64, u64, UInt64, bigint),
    (Float32, f32, Float32, number),
    (Float64, f64, Float64, number),
);

/// A row array: an ordered sequence of records.
///
/// Column names come from the keys of the first record; a key missing from a
/// later record reads as null.
#[derive(Clone, Copy, Debug)]
pub struct RowArray<'a> {
    rows: &'a [Record],
}

impl<'a> RowArray<'a> {
    pub fn new(rows: &'a [Record]) -> Self {
        Self { rows }
    }
}

struct RowArrayColumn<'a> {
    rows: &'a [Record],
    name: String,
}

impl SourceColumn for RowArrayColumn<'_> {
    fn get(&self, row: usize) -> Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(&self.name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

impl SourceTable for RowArray<'_> {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.keys().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    fn column(&self, name: &str) -> Option<Box<dyn SourceColumn + '_>> {
        Some(Box::new(RowArrayColumn {
            rows: self.rows,
            name: name.to_owned(),
        }))
    }

    fn scan(
        &self,
        visit: &mut dyn FnMut(usize) -> EncodeResult<()>,
        _ordered: bool,
        limit: usize,
        offset: usize,
    ) -> EncodeResult<()> {
        let end = self.rows.len().min(offset.saturating_add(limit));
        for row in offset..end {
            visit(row)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum ColumnData {
    Values(Vec<Value>),
    Typed {
        values: TypedValues,
        validity: Option<BitVec>,
    },
}

#[derive(Clone, Debug)]
struct MemoryColumn {
    name: String,
    data: ColumnData,
    encoded: Option<ArrayData>,
}

impl SourceColumn for MemoryColumn {
    fn get(&self, row: usize) -> Value {
        match &self.data {
            ColumnData::Values(values) => values.get(row).cloned().unwrap_or(Value::Null),
            ColumnData::Typed { values, validity } => {
                if validity.as_ref().is_some_and(|v| row < v.len() && !v.get(row)) {
                    return Value::Null;
                }
                values.as_slice().value(row)
            }
        }
    }

    fn storage(&self) -> ColumnStorage<'_> {
        match &self.data {
            ColumnData::Values(values) => ColumnStorage::Values(values),
            ColumnData::Typed { values, validity } => ColumnStorage::Typed {
                values: values.as_slice(),
                validity: validity.as_ref(),
            },
        }
    }

    fn encoded(&self) -> Option<&ArrayData> {
        self.encoded.as_ref()
    }
}

/// An in-memory column store with optional filter and sort views.
///
/// Views share nothing mutable with the base table: `filter` and `order_by`
/// return new tables over cloned storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
    columns: Vec<MemoryColumn>,
    rows: usize,
    filter: Option<BitVec>,
    order: Option<Vec<usize>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_len(&self, name: &str, len: usize) -> EncodeResult<()> {
        if !self.columns.is_empty() && len != self.rows {
            return Err(EncodeError::ColumnLengthMismatch {
                column: name.to_owned(),
                expected: self.rows,
                actual: len,
            });
        }
        Ok(())
    }

    fn push_column(mut self, name: &str, data: ColumnData, len: usize) -> EncodeResult<Self> {
        self.check_len(name, len)?;
        self.rows = len;
        self.columns.retain(|c| c.name != name);
        self.columns.push(MemoryColumn {
            name: name.to_owned(),
            data,
            encoded: None,
        });
        Ok(self)
    }

    /// Add a column of dynamic values.
    pub fn with_values(self, name: &str, values: Vec<Value>) -> EncodeResult<Self> {
        let len = values.len();
        self.push_column(name, ColumnData::Values(values), len)
    }

    /// Add a column backed by a typed numeric region.
    pub fn with_typed(
        self,
        name: &str,
        values: impl Into<TypedValues>,
        validity: Option<BitVec>,
    ) -> EncodeResult<Self> {
        let values = values.into();
        let len = values.len();
        self.push_column(name, ColumnData::Typed { values, validity }, len)
    }

    /// Attach previously encoded buffers to an existing column.
    pub fn with_encoded(mut self, name: &str, data: ArrayData) -> EncodeResult<Self> {
        if data.len() != self.rows {
            return Err(EncodeError::ColumnLengthMismatch {
                column: name.to_owned(),
                expected: self.rows,
                actual: data.len(),
            });
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EncodeError::UnknownColumn(name.to_owned()))?;
        column.encoded = Some(data);
        Ok(self)
    }

    /// Keep only storage rows whose bit is set in `mask`.
    pub fn filter(&self, mask: BitVec) -> Self {
        let mut out = self.clone();
        out.filter = Some(mask);
        out
    }

    /// Present storage rows in the order given by `order` (a permutation).
    pub fn order_by(&self, order: Vec<usize>) -> Self {
        let mut out = self.clone();
        out.order = Some(order);
        out
    }

    fn passes(&self, row: usize) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |mask| row < mask.len() && mask.get(row))
    }
}

impl SourceTable for MemoryTable {
    fn row_count(&self) -> usize {
        match &self.filter {
            Some(_) => (0..self.rows).filter(|r| self.passes(*r)).count(),
            None => self.rows,
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn column(&self, name: &str) -> Option<Box<dyn SourceColumn + '_>> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| Box::new(c) as Box<dyn SourceColumn + '_>)
    }

    fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    fn scan(
        &self,
        visit: &mut dyn FnMut(usize) -> EncodeResult<()>,
        ordered: bool,
        limit: usize,
        offset: usize,
    ) -> EncodeResult<()> {
        let mut walk = |rows: &mut dyn Iterator<Item = usize>| -> EncodeResult<()> {
            for row in rows
                .filter(|r| self.passes(*r))
                .skip(offset)
                .take(limit)
            {
                visit(row)?;
            }
            Ok(())
        };

        match (&self.order, ordered) {
            (Some(order), true) => walk(&mut order.iter().copied()),
            _ => walk(&mut (0..self.rows)),
        }
    }
}
