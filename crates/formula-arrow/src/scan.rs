#![forbid(unsafe_code)]

use crate::error::EncodeResult;
use crate::source::{ColumnStorage, SourceColumn, SourceTable};
use crate::value::Value;

/// Walks one column of a [`SourceTable`] in output order, restricted to a
/// `limit`/`offset` window.
///
/// When the window covers the whole unfiltered, unordered table and the
/// column exposes contiguous storage, the storage is walked directly instead
/// of going through the table's row scan.
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    table: &'a dyn SourceTable,
    limit: usize,
    offset: usize,
    scan_all: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(table: &'a dyn SourceTable, limit: usize, offset: usize) -> Self {
        let scan_all = offset == 0
            && table.row_count() <= limit
            && !table.is_filtered()
            && !table.is_ordered();
        Self {
            table,
            limit,
            offset,
            scan_all,
        }
    }

    pub fn table(&self) -> &'a dyn SourceTable {
        self.table
    }

    /// Whether the window covers the entire table in storage order.
    pub fn scan_all(&self) -> bool {
        self.scan_all
    }

    /// Number of rows the window should produce.
    pub fn num_rows(&self) -> usize {
        self.limit
            .min(self.table.row_count().saturating_sub(self.offset))
    }

    /// Call `visit(value, i)` for each windowed row, with `i` counting from 0.
    /// Returns the number of rows visited.
    pub fn scan(
        &self,
        column: &dyn SourceColumn,
        visit: &mut dyn FnMut(&Value, usize) -> EncodeResult<()>,
    ) -> EncodeResult<usize> {
        if self.scan_all {
            match column.storage() {
                ColumnStorage::Values(values) => {
                    for (i, value) in values.iter().enumerate() {
                        visit(value, i)?;
                    }
                    return Ok(values.len());
                }
                ColumnStorage::Typed { values, validity } => {
                    for i in 0..values.len() {
                        let valid = validity.map_or(true, |v| i >= v.len() || v.get(i));
                        let value = if valid { values.value(i) } else { Value::Null };
                        visit(&value, i)?;
                    }
                    return Ok(values.len());
                }
                ColumnStorage::Opaque => {}
            }
        }

        let mut i = 0;
        self.table.scan(
            &mut |row| {
                visit(&column.get(row), i)?;
                i += 1;
                Ok(())
            },
            true,
            self.limit,
            self.offset,
        )?;
        Ok(i)
    }
}
