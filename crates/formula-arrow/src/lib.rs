//! Columnar encoding of tabular data for Formula.
//!
//! This crate turns row records or an abstract [`SourceTable`] into
//! Arrow-layout columns:
//! - Type inference over untyped value streams (narrowest integer width,
//!   exact 64-bit range checks, numeric/string escalation).
//! - Per-type builders producing 64-byte padded buffers with LSB-first
//!   validity bitmaps, `i32` offsets and narrowed dictionary codes.
//! - Zero-copy adoption of already-encoded or typed source storage when the
//!   window covers the whole unfiltered, unordered source.
//!
//! With the `arrow` feature, tables convert to arrow-rs `RecordBatch`es and
//! serialize as Arrow IPC streams.

#![forbid(unsafe_code)]

#[cfg(feature = "arrow")]
pub mod arrow;
mod bitmap;
mod buffer;
pub mod builder;
mod column;
mod data;
mod error;
mod profile;
mod resolve;
mod scan;
mod source;
mod table;
mod types;
mod value;

pub use crate::bitmap::BitVec;
pub use crate::buffer::{padded_len, Buffer, NativeType, ALIGNMENT};
pub use crate::builder::{builder, ArrayBuilder};
pub use crate::column::{encode_column, Column};
pub use crate::data::ArrayData;
pub use crate::error::{EncodeError, EncodeResult};
pub use crate::profile::Profiler;
pub use crate::resolve::{resolve_type, type_compatible, TypeSpec};
pub use crate::scan::Scanner;
pub use crate::source::{
    ColumnStorage, MemoryTable, RowArray, SourceColumn, SourceTable, TypedSlice, TypedValues,
};
pub use crate::table::{
    encode, encode_json, encode_rows, ColumnSelection, DeriveColumns, EncodeOptions, Table,
};
pub use crate::types::{DataType, Field, IndexType};
pub use crate::value::{Record, Value, ValueKind};
