#![forbid(unsafe_code)]

use super::{builder, check_monotonic, offset, ArrayBuilder, Validity};
use crate::buffer::Buffer;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::types::{DataType, Field};
use crate::value::Value;

/// `List<T>` builder: `i32` offsets into a single child column.
///
/// Elements are appended to the child in row order, so rows must arrive
/// with non-decreasing indices.
pub struct ListBuilder {
    item: Field,
    offsets: Vec<i32>,
    child: Box<ArrayBuilder>,
    child_len: usize,
    validity: Validity,
}

impl ListBuilder {
    pub fn new(item: Field, expected_len: usize, nullable: bool) -> Self {
        let mut offsets = Vec::with_capacity(expected_len + 1);
        offsets.push(0);
        // Element nullability is checked here; the child always tracks validity.
        let child = Box::new(builder(&item.data_type, expected_len, true));
        Self {
            item,
            offsets,
            child,
            child_len: 0,
            validity: Validity::new(nullable, expected_len),
        }
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        check_monotonic(index, self.len())?;
        while self.len() < index {
            self.push_null()?;
        }
        match value {
            Value::Null => self.push_null(),
            Value::List(items) => {
                self.validity.set(self.len(), true)?;
                for item in items {
                    if item.is_null() && !self.item.nullable {
                        return Err(EncodeError::NullNotAllowed {
                            index: self.child_len,
                        });
                    }
                    self.child.set(item, self.child_len)?;
                    self.child_len += 1;
                }
                self.offsets.push(offset(self.child_len)?);
                Ok(())
            }
            other => Err(EncodeError::conflict(
                &DataType::List(Box::new(self.item.clone())),
                other.kind(),
            )),
        }
    }

    fn push_null(&mut self) -> EncodeResult<()> {
        self.validity.set(self.len(), false)?;
        self.offsets.push(offset(self.child_len)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn finish(self) -> EncodeResult<ArrayData> {
        let len = self.len();
        let child = self.child.finish()?;
        let (null_count, validity) = self.validity.finish(len);
        Ok(ArrayData::new(
            DataType::List(Box::new(self.item)),
            len,
            null_count,
            validity,
            vec![Buffer::from_slice(&self.offsets)],
        )
        .with_children(vec![child]))
    }
}

/// `Struct{fields}` builder: one child builder per field, written at the
/// parent's row index. A null struct row writes null into every child.
pub struct StructBuilder {
    fields: Vec<Field>,
    children: Vec<ArrayBuilder>,
    validity: Validity,
    len: usize,
}

impl StructBuilder {
    pub fn new(fields: Vec<Field>, expected_len: usize, nullable: bool) -> Self {
        let children = fields
            .iter()
            .map(|f| builder(&f.data_type, expected_len, true))
            .collect();
        Self {
            fields,
            children,
            validity: Validity::new(nullable, expected_len),
            len: 0,
        }
    }

    pub fn set(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        check_monotonic(index, self.len)?;
        while self.len < index {
            self.set_row(&Value::Null, self.len)?;
        }
        self.set_row(value, index)
    }

    fn set_row(&mut self, value: &Value, index: usize) -> EncodeResult<()> {
        match value {
            Value::Null => {
                self.validity.set(index, false)?;
                for child in &mut self.children {
                    child.set(&Value::Null, index)?;
                }
            }
            Value::Struct(record) => {
                self.validity.set(index, true)?;
                for (field, child) in self.fields.iter().zip(&mut self.children) {
                    let v = record.get(&field.name).unwrap_or(&Value::Null);
                    if v.is_null() && !field.nullable {
                        return Err(EncodeError::NullNotAllowed { index });
                    }
                    child.set(v, index)?;
                }
            }
            other => {
                return Err(EncodeError::conflict(
                    &DataType::Struct(self.fields.clone()),
                    other.kind(),
                ))
            }
        }
        self.len = index + 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn finish(self) -> EncodeResult<ArrayData> {
        let children = self
            .children
            .into_iter()
            .map(ArrayBuilder::finish)
            .collect::<EncodeResult<Vec<_>>>()?;
        let (null_count, validity) = self.validity.finish(self.len);
        Ok(
            ArrayData::new(DataType::Struct(self.fields), self.len, null_count, validity, Vec::new())
                .with_children(children),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_offsets_follow_child_rows() {
        let mut b = ListBuilder::new(Field::new("item", DataType::Int32, true), 4, true);
        b.set(&Value::List(vec![1.into(), Value::Null, 3.into()]), 0).unwrap();
        b.set(&Value::List(vec![4.into(), 5.into()]), 1).unwrap();
        b.set(&Value::Null, 2).unwrap();
        b.set(&Value::List(vec![]), 3).unwrap();
        let data = b.finish().unwrap();

        assert_eq!(data.len(), 4);
        assert_eq!(data.null_count(), 1);
        assert_eq!(data.buffers()[0].typed_values::<i32>(5), vec![0, 3, 5, 5, 5]);
        let child = &data.children()[0];
        assert_eq!(child.len(), 5);
        assert_eq!(child.null_count(), 1);
        assert_eq!(child.buffers()[0].typed_values::<i32>(5), vec![1, 0, 3, 4, 5]);
    }

    #[test]
    fn list_rejects_null_items_when_not_nullable() {
        let mut b = ListBuilder::new(Field::new("item", DataType::Float64, false), 1, true);
        assert!(matches!(
            b.set(&Value::List(vec![1.5.into(), Value::Null]), 0),
            Err(EncodeError::NullNotAllowed { index: 1 })
        ));
    }

    #[test]
    fn struct_children_share_row_index() {
        let fields = vec![
            Field::new("key", DataType::UInt8, true),
            Field::new("name", DataType::Utf8, true),
        ];
        let mut b = StructBuilder::new(fields, 3, true);
        b.set(&Record::new().with("key", 1).with("name", "a").into(), 0).unwrap();
        b.set(&Value::Null, 1).unwrap();
        b.set(&Record::new().with("key", 3).into(), 2).unwrap();
        let data = b.finish().unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.null_count(), 1);
        assert!(data.buffers().is_empty());
        let keys = &data.children()[0];
        assert_eq!(keys.buffers()[0].typed_values::<u8>(3), vec![1, 0, 3]);
        let names = &data.children()[1];
        assert_eq!(names.null_count(), 2);
        assert_eq!(names.buffers()[0].typed_values::<i32>(4), vec![0, 1, 1, 1]);
    }

    #[test]
    fn struct_rejects_missing_required_field() {
        let fields = vec![Field::new("key", DataType::Int32, false)];
        let mut b = StructBuilder::new(fields, 1, true);
        assert!(matches!(
            b.set(&Record::new().with("other", 1).into(), 0),
            Err(EncodeError::NullNotAllowed { index: 0 })
        ));
        assert!(matches!(
            b.set(&Value::Number(1.0), 0),
            Err(EncodeError::TypeConflict { .. })
        ));
    }
}
