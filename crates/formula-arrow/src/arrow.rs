//! Hand-off of encoded tables to arrow-rs.
//!
//! Buffers are copied into arrow-rs `ArrayData` and validated there, so a
//! layout mistake surfaces as [`EncodeError::Arrow`] rather than later in a
//! reader.

#![forbid(unsafe_code)]

use crate::buffer::Buffer;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::table::Table;
use crate::types::{DataType, Field};
use arrow_array::{make_array, ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType as ArrowType, Field as ArrowField, Fields, Schema};
use bytes::Bytes;
use std::sync::Arc;

/// The arrow-rs type for `data_type`.
pub fn arrow_type(data_type: &DataType) -> ArrowType {
    match data_type {
        DataType::Null => ArrowType::Null,
        DataType::Boolean => ArrowType::Boolean,
        DataType::Int8 => ArrowType::Int8,
        DataType::Int16 => ArrowType::Int16,
        DataType::Int32 => ArrowType::Int32,
        DataType::Int64 => ArrowType::Int64,
        DataType::UInt8 => ArrowType::UInt8,
        DataType::UInt16 => ArrowType::UInt16,
        DataType::UInt32 => ArrowType::UInt32,
        DataType::UInt64 => ArrowType::UInt64,
        DataType::Float32 => ArrowType::Float32,
        DataType::Float64 => ArrowType::Float64,
        DataType::Utf8 => ArrowType::Utf8,
        DataType::Dictionary(index) => ArrowType::Dictionary(
            Box::new(arrow_type(&index.data_type())),
            Box::new(ArrowType::Utf8),
        ),
        DataType::List(item) => ArrowType::List(Arc::new(arrow_field(item))),
        DataType::Struct(fields) => {
            ArrowType::Struct(fields.iter().map(arrow_field).collect::<Fields>())
        }
    }
}

pub fn arrow_field(field: &Field) -> ArrowField {
    ArrowField::new(field.name.as_str(), arrow_type(&field.data_type), field.nullable)
}

fn arrow_buffer(buffer: &Buffer) -> arrow_buffer::Buffer {
    arrow_buffer::Buffer::from_vec(buffer.as_slice().to_vec())
}

/// Convert one column's buffers into a validated arrow-rs array.
pub fn to_arrow_data(data: &ArrayData) -> EncodeResult<arrow_data::ArrayData> {
    let mut children = data
        .children()
        .iter()
        .map(to_arrow_data)
        .collect::<EncodeResult<Vec<_>>>()?;
    if let Some(dictionary) = data.dictionary() {
        children.push(to_arrow_data(dictionary)?);
    }

    let mut builder = arrow_data::ArrayData::builder(arrow_type(data.data_type()))
        .len(data.len())
        .buffers(data.buffers().iter().map(arrow_buffer).collect())
        .child_data(children);
    if let Some(validity) = data.validity() {
        builder = builder
            .null_count(data.null_count())
            .null_bit_buffer(Some(arrow_buffer(validity)));
    }
    Ok(builder.build()?)
}

impl Table {
    /// Top-level dictionary columns get distinct IPC dictionary ids.
    #[allow(deprecated)]
    pub fn arrow_schema(&self) -> Schema {
        let mut next_dict_id = 0;
        let fields = self.columns().iter().map(|c| {
            let field = c.field();
            if !matches!(field.data_type, DataType::Dictionary(_)) {
                return arrow_field(field);
            }
            next_dict_id += 1;
            ArrowField::new_dict(
                field.name.as_str(),
                arrow_type(&field.data_type),
                field.nullable,
                next_dict_id,
                false,
            )
        });
        Schema::new(fields.collect::<Vec<_>>())
    }

    pub fn to_record_batch(&self) -> EncodeResult<RecordBatch> {
        let arrays = self
            .columns()
            .iter()
            .map(|c| to_arrow_data(c.data()).map(make_array))
            .collect::<EncodeResult<Vec<ArrayRef>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        RecordBatch::try_new_with_options(Arc::new(self.arrow_schema()), arrays, &options)
            .map_err(EncodeError::from)
    }

    /// Serialize as a single-batch Arrow IPC stream.
    pub fn to_ipc_stream(&self) -> EncodeResult<Bytes> {
        let batch = self.to_record_batch()?;
        let mut out = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut out, batch.schema().as_ref())?;
            writer.write(&batch)?;
            writer.finish()?;
        }
        Ok(Bytes::from(out))
    }
}
