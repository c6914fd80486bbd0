#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::builder::builder;
use crate::data::ArrayData;
use crate::error::{EncodeError, EncodeResult};
use crate::profile::Profiler;
use crate::resolve::{resolve_type, type_compatible, TypeSpec};
use crate::scan::Scanner;
use crate::source::{ColumnStorage, SourceTable, TypedSlice};
use crate::table::EncodeOptions;
use crate::types::{DataType, Field};

/// One finished output column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    field: Field,
    data: ArrayData,
}

impl Column {
    pub(crate) fn new(name: &str, data: ArrayData, nullable: bool) -> Self {
        let nullable = nullable || data.null_count() > 0 || *data.data_type() == DataType::Null;
        Self {
            field: Field::new(name, data.data_type().clone(), nullable),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn data_type(&self) -> &DataType {
        &self.field.data_type
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }
}

/// Encode a single column of `source` without assembling a table.
///
/// The row window comes from `options`; the requested type overrides any
/// entry in `options.types`. No row-count check is applied to the result.
pub fn encode_column(
    source: &dyn SourceTable,
    name: &str,
    requested: Option<&TypeSpec>,
    options: &EncodeOptions,
) -> EncodeResult<Column> {
    let scanner = Scanner::new(source, options.limit, options.offset);
    let requested = requested.or_else(|| options.types.get(name));
    assemble_column(&scanner, name, requested)
}

/// Build one column, taking the first applicable route:
/// 1. adopt the source's already-encoded buffers,
/// 2. copy a typed storage region,
/// 3. profile (when no type was requested) and build.
pub(crate) fn assemble_column(
    scanner: &Scanner<'_>,
    name: &str,
    requested: Option<&TypeSpec>,
) -> EncodeResult<Column> {
    let column = scanner
        .table()
        .column(name)
        .ok_or_else(|| EncodeError::UnknownColumn(name.to_owned()))?;
    let mut data_type = resolve_type(requested)?;
    let mut nullable = true;

    if scanner.scan_all() {
        if let Some(encoded) = column.encoded() {
            if type_compatible(Some(encoded.data_type()), data_type.as_ref()) {
                log::debug!(
                    "column {name:?}: adopting encoded {} buffers ({} rows)",
                    encoded.data_type(),
                    encoded.len()
                );
                return Ok(Column::new(name, encoded.clone(), false));
            }
        }
    }

    if let ColumnStorage::Typed { values, validity } = column.storage() {
        let native = values.data_type();
        if scanner.scan_all() && type_compatible(Some(&native), data_type.as_ref()) {
            log::debug!(
                "column {name:?}: copying {native} storage ({} rows)",
                values.len()
            );
            let data = typed_region(values, validity);
            return Ok(Column::new(name, data, validity.is_some()));
        }
        nullable = validity.is_some();
        data_type = data_type.or(Some(native));
    }

    let data_type = match data_type {
        Some(data_type) => data_type,
        None => {
            let mut profiler = Profiler::new();
            scanner.scan(&*column, &mut |value, _| {
                profiler.add(value);
                Ok(())
            })?;
            nullable = profiler.is_nullable();
            let inferred = profiler.data_type()?;
            log::debug!(
                "column {name:?}: inferred {inferred} from {} values ({} null)",
                profiler.count(),
                profiler.null_count()
            );
            inferred
        }
    };

    let mut b = builder(&data_type, scanner.num_rows(), nullable);
    scanner.scan(&*column, &mut |value, index| b.set(value, index))?;
    Ok(Column::new(name, b.finish()?, nullable))
}

/// A fixed-width storage region as column data, nulls taken from `validity`.
fn typed_region(values: TypedSlice<'_>, validity: Option<&BitVec>) -> ArrayData {
    let len = values.len();
    let nulls = validity.map(|bits| {
        let mut bits = bits.clone();
        bits.resize(len, true);
        bits
    });
    let nulls = nulls.filter(|bits| bits.count_zeros() > 0);
    let (null_count, validity, payload) = match nulls {
        // Null slots hold zero, matching what the builders write.
        Some(bits) => (
            bits.count_zeros(),
            Some(bits.to_buffer()),
            values.to_masked_buffer(&bits),
        ),
        None => (0, None, values.to_buffer()),
    };
    ArrayData::new(values.data_type(), len, null_count, validity, vec![payload])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTable;
    use crate::types::IndexType;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn options() -> EncodeOptions {
        EncodeOptions::default()
    }

    #[test]
    fn typed_region_is_copied_without_profiling() {
        let t = MemoryTable::new()
            .with_typed(
                "x",
                vec![5i32, -1, 7],
                Some(BitVec::from_bools([true, false, true])),
            )
            .unwrap();
        let col = encode_column(&t, "x", None, &options()).unwrap();
        assert_eq!(col.data_type(), &DataType::Int32);
        assert!(col.field().nullable);
        assert_eq!(col.null_count(), 1);
        assert_eq!(col.data().buffers()[0].typed_values::<i32>(3), vec![5, 0, 7]);
    }

    #[test]
    fn typed_region_with_incompatible_request_is_rebuilt() {
        let t = MemoryTable::new()
            .with_typed("x", vec![1u8, 2, 3], None)
            .unwrap();
        let col = encode_column(&t, "x", Some(&"float64".into()), &options()).unwrap();
        assert_eq!(col.data_type(), &DataType::Float64);
        assert!(!col.field().nullable);
        assert!(col.data().validity().is_none());
        assert_eq!(
            col.data().buffers()[0].typed_values::<f64>(3),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn windowed_typed_region_uses_native_type() {
        let t = MemoryTable::new()
            .with_typed("x", vec![10u64, 20, 30, 40], None)
            .unwrap();
        let col = encode_column(
            &t,
            "x",
            None,
            &options().with_limit(2).with_offset(1),
        )
        .unwrap();
        assert_eq!(col.data_type(), &DataType::UInt64);
        assert_eq!(col.data().buffers()[0].typed_values::<u64>(2), vec![20, 30]);
    }

    #[test]
    fn encoded_buffers_are_adopted_when_compatible() {
        let base = MemoryTable::new()
            .with_values("s", ["a", "b", "a"].into_iter().map(Value::from).collect())
            .unwrap();
        let dict: TypeSpec = DataType::Dictionary(IndexType::Int32).into();
        let encoded = encode_column(&base, "s", Some(&dict), &options()).unwrap();
        let t = base.with_encoded("s", encoded.data().clone()).unwrap();

        let adopted = encode_column(&t, "s", None, &options()).unwrap();
        assert!(adopted.data().buffers()[0].ptr_eq(&encoded.data().buffers()[0]));

        // A different requested type skips the encoded buffers.
        let rebuilt = encode_column(&t, "s", Some(&"utf8".into()), &options()).unwrap();
        assert_eq!(rebuilt.data_type(), &DataType::Utf8);

        // So does a filtered view.
        let filtered = t.filter(BitVec::from_bools([true, true, false]));
        let col = encode_column(&filtered, "s", None, &options()).unwrap();
        assert_eq!(col.data_type(), &DataType::Utf8);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn unknown_column_is_reported() {
        let t = MemoryTable::new();
        assert!(matches!(
            encode_column(&t, "missing", None, &options()),
            Err(EncodeError::UnknownColumn(name)) if name == "missing"
        ));
    }
}
