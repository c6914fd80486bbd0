#![forbid(unsafe_code)]

use crate::column::{assemble_column, Column};
use crate::error::{EncodeError, EncodeResult};
use crate::resolve::TypeSpec;
use crate::scan::Scanner;
use crate::source::{RowArray, SourceTable};
use crate::types::Field;
use crate::value::Record;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Derives the output column list from the source's natural column names.
pub type DeriveColumns = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// Which columns to encode, and in what order.
#[derive(Clone, Default)]
pub enum ColumnSelection {
    /// The source's own column order.
    #[default]
    Natural,
    Names(Vec<String>),
    Derive(DeriveColumns),
}

impl fmt::Debug for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelection::Natural => f.write_str("Natural"),
            ColumnSelection::Names(names) => f.debug_tuple("Names").field(names).finish(),
            ColumnSelection::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

impl ColumnSelection {
    fn resolve(&self, source: &dyn SourceTable) -> Vec<String> {
        match self {
            ColumnSelection::Natural => source.column_names(),
            ColumnSelection::Names(names) => names.clone(),
            ColumnSelection::Derive(derive) => derive(&source.column_names()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Requested type per column name; absent columns are inferred.
    pub types: HashMap<String, TypeSpec>,
    /// Maximum number of output rows.
    pub limit: usize,
    /// Number of leading source rows to skip.
    pub offset: usize,
    pub columns: ColumnSelection,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            types: HashMap::new(),
            limit: usize::MAX,
            offset: 0,
            columns: ColumnSelection::Natural,
        }
    }
}

impl EncodeOptions {
    pub fn with_type(mut self, column: impl Into<String>, spec: impl Into<TypeSpec>) -> Self {
        self.types.insert(column.into(), spec.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = ColumnSelection::Names(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_column_derivation(
        mut self,
        derive: impl Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.columns = ColumnSelection::Derive(Arc::new(derive));
        self
    }
}

/// An encoded table: ordered columns sharing one row count.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn schema(&self) -> Vec<Field> {
        self.columns.iter().map(|c| c.field().clone()).collect()
    }

    /// Total bytes across every buffer, padding included.
    pub fn buffer_size_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.data().buffer_size_bytes()).sum()
    }
}

/// Encode `source` into a columnar [`Table`].
///
/// Every column must come out with `min(limit, row_count - offset)` rows;
/// the first failing column aborts the whole call.
pub fn encode(source: &dyn SourceTable, options: &EncodeOptions) -> EncodeResult<Table> {
    let scanner = Scanner::new(source, options.limit, options.offset);
    let num_rows = scanner.num_rows();
    let names = options.columns.resolve(source);

    let assemble = |name: &String| assemble_column(&scanner, name, options.types.get(name));

    #[cfg(feature = "parallel")]
    let columns = names.par_iter().map(assemble).collect::<EncodeResult<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let columns = names.iter().map(assemble).collect::<EncodeResult<Vec<_>>>()?;

    if let Some(bad) = columns.iter().find(|c| c.len() != num_rows) {
        return Err(EncodeError::ColumnLengthMismatch {
            column: bad.name().to_owned(),
            expected: num_rows,
            actual: bad.len(),
        });
    }

    log::trace!(
        "encoded {} columns x {} rows ({} bytes)",
        columns.len(),
        num_rows,
        columns.iter().map(|c| c.data().buffer_size_bytes()).sum::<usize>()
    );
    Ok(Table { columns, num_rows })
}

/// Encode an array of row records.
pub fn encode_rows(rows: &[Record], options: &EncodeOptions) -> EncodeResult<Table> {
    encode(&RowArray::new(rows), options)
}

/// Encode a JSON array of objects.
pub fn encode_json(json: &serde_json::Value, options: &EncodeOptions) -> EncodeResult<Table> {
    let serde_json::Value::Array(items) = json else {
        return Err(EncodeError::UnsupportedInputType(json_kind(json).to_owned()));
    };
    let rows = items
        .iter()
        .map(Record::from_json)
        .collect::<EncodeResult<Vec<_>>>()?;
    encode_rows(&rows, options)
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        (0..4)
            .map(|i| Record::new().with("a", i).with("b", format!("r{i}")))
            .collect()
    }

    #[test]
    fn explicit_column_list_sets_order() {
        let table = encode_rows(&rows(), &EncodeOptions::default().with_columns(["b", "a"])).unwrap();
        let names: Vec<_> = table.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(table.num_rows(), 4);
    }

    #[test]
    fn derived_column_list() {
        let options = EncodeOptions::default()
            .with_column_derivation(|names| names.iter().filter(|n| *n != "a").cloned().collect());
        let table = encode_rows(&rows(), &options).unwrap();
        assert_eq!(table.num_columns(), 1);
        assert_eq!(table.column_at(0).unwrap().name(), "b");
    }

    #[test]
    fn requested_types_override_inference() {
        let options = EncodeOptions::default().with_type("a", "int64");
        let table = encode_rows(&rows(), &options).unwrap();
        assert_eq!(table.column("a").unwrap().data_type(), &DataType::Int64);
        assert_eq!(
            table.schema(),
            vec![
                Field::new("a", DataType::Int64, true),
                Field::new("b", DataType::Utf8, false),
            ]
        );
    }

    #[test]
    fn empty_rows_give_empty_table() {
        let table = encode_rows(&[], &EncodeOptions::default()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 0);
    }

    #[test]
    fn json_input_must_be_an_array() {
        let table = encode_json(&json!([{"x": 1}, {"x": null}]), &EncodeOptions::default()).unwrap();
        let x = table.column("x").unwrap();
        assert_eq!(x.data_type(), &DataType::UInt8);
        assert_eq!(x.null_count(), 1);

        assert!(matches!(
            encode_json(&json!({"x": 1}), &EncodeOptions::default()),
            Err(EncodeError::UnsupportedInputType(kind)) if kind == "object"
        ));
        assert!(matches!(
            encode_json(&json!([1, 2]), &EncodeOptions::default()),
            Err(EncodeError::UnsupportedInputType(_))
        ));
    }

    #[test]
    fn json_columns_follow_first_object_key_order() {
        let table = encode_json(&json!([{"b": 1, "a": 2}]), &EncodeOptions::default()).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn missing_keys_read_as_null() {
        let rows = vec![
            Record::new().with("a", 1).with("b", true),
            Record::new().with("a", Value::Null),
        ];
        let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
        assert_eq!(table.column("a").unwrap().null_count(), 1);
        assert_eq!(table.column("b").unwrap().data_type(), &DataType::Boolean);
        assert_eq!(table.column("b").unwrap().null_count(), 1);
    }
}
