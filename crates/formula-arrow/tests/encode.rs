use formula_arrow::{
    encode, encode_rows, BitVec, ColumnStorage, DataType, EncodeError, EncodeOptions, IndexType,
    MemoryTable, Record, SourceColumn, SourceTable, Table, Value,
};
use pretty_assertions::assert_eq;

fn column_rows(name: &str, values: impl IntoIterator<Item = Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| Record::new().with(name, v))
        .collect()
}

fn only_type(table: &Table) -> DataType {
    table.column_at(0).expect("one column").data_type().clone()
}

fn utf8_values(table: &Table, name: &str) -> Vec<Option<String>> {
    let data = table.column(name).expect("column").data();
    let offsets = data.buffers()[0].typed_values::<i32>(data.len() + 1);
    let bytes = data.buffers()[1].as_slice();
    (0..data.len())
        .map(|i| {
            data.is_valid(i).then(|| {
                let (start, end) = (offsets[i] as usize, offsets[i + 1] as usize);
                String::from_utf8(bytes[start..end].to_vec()).unwrap()
            })
        })
        .collect()
}

#[test]
fn small_unsigned_integers_resolve_to_uint8() {
    let rows = column_rows("x", [0, 128, 255].map(Value::from));
    let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
    assert_eq!(only_type(&table), DataType::UInt8);
    let data = table.column("x").unwrap().data();
    assert_eq!(data.buffers()[0].typed_values::<u8>(3), vec![0, 128, 255]);
    assert!(data.validity().is_none());
}

#[test]
fn values_beyond_32_bits_resolve_to_float64() {
    let rows = column_rows("x", [0.0, 1.0, 4_294_967_296.0].map(Value::from));
    let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
    assert_eq!(only_type(&table), DataType::Float64);
    assert_eq!(
        table.column("x").unwrap().data().buffers()[0].typed_values::<f64>(3),
        vec![0.0, 1.0, 4_294_967_296.0]
    );
}

#[test]
fn numbers_mixed_with_strings_resolve_to_utf8() {
    let rows = column_rows(
        "x",
        [Value::from(1), Value::from(2), Value::from(3), Value::from("foo")],
    );
    let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
    assert_eq!(only_type(&table), DataType::Utf8);
    assert_eq!(
        utf8_values(&table, "x"),
        vec![
            Some("1".to_owned()),
            Some("2".to_owned()),
            Some("3".to_owned()),
            Some("foo".to_owned()),
        ]
    );
}

#[test]
fn numbers_mixed_with_booleans_conflict() {
    let rows = column_rows(
        "x",
        [Value::from(1), Value::from(2), Value::from(3), Value::from(true)],
    );
    assert!(matches!(
        encode_rows(&rows, &EncodeOptions::default()),
        Err(EncodeError::TypeConflict { .. })
    ));
}

#[test]
fn bigints_use_exact_64_bit_ranges() {
    let rows = column_rows(
        "x",
        [Value::from(i64::MIN), Value::from(0i64), Value::from(i64::MAX)],
    );
    let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
    assert_eq!(only_type(&table), DataType::Int64);
    assert_eq!(
        table.column("x").unwrap().data().buffers()[0].typed_values::<i64>(3),
        vec![i64::MIN, 0, i64::MAX]
    );

    let rows = column_rows("x", [Value::from(0u64), Value::from(u64::MAX)]);
    let table = encode_rows(&rows, &EncodeOptions::default()).unwrap();
    assert_eq!(only_type(&table), DataType::UInt64);

    let rows = column_rows(
        "x",
        [Value::BigInt(0), Value::BigInt(1), Value::BigInt(1i128 << 64)],
    );
    assert!(matches!(
        encode_rows(&rows, &EncodeOptions::default()),
        Err(EncodeError::RangeOverflow { value }) if value == 1i128 << 64
    ));
}

#[test]
fn window_selects_rows_after_offset() {
    let rows: Vec<Record> = (0..6)
        .map(|i| Record::new().with("id", i).with("name", format!("row{i}")))
        .collect();
    let table = encode_rows(&rows, &EncodeOptions::default().with_limit(2).with_offset(1)).unwrap();

    assert_eq!(table.num_rows(), 2);
    let ids = table.column("id").unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids.data().buffers()[0].typed_values::<u8>(2), vec![1, 2]);
    assert_eq!(
        utf8_values(&table, "name"),
        vec![Some("row1".to_owned()), Some("row2".to_owned())]
    );
}

#[test]
fn window_past_the_end_is_empty() {
    let rows = column_rows("x", [1, 2].map(Value::from));
    let table = encode_rows(&rows, &EncodeOptions::default().with_offset(5)).unwrap();
    assert_eq!(table.num_rows(), 0);
    assert_eq!(table.column("x").unwrap().len(), 0);
    assert_eq!(table.column("x").unwrap().data_type(), &DataType::Null);
}

#[test]
fn encoding_is_idempotent() {
    let rows: Vec<Record> = (0..50)
        .map(|i| {
            Record::new()
                .with("n", if i % 7 == 0 { Value::Null } else { Value::from(i * 3 - 40) })
                .with("s", format!("v{}", i % 5))
                .with("f", i as f64 / 4.0)
        })
        .collect();
    let options = EncodeOptions::default().with_type("s", "dictionary<int32>");
    let first = encode_rows(&rows, &options).unwrap();
    let second = encode_rows(&rows, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.column("s").unwrap().data_type(),
        &DataType::Dictionary(IndexType::Int8)
    );
}

#[test]
fn typed_storage_matches_the_general_path() {
    // Null slots carry stale payloads; both paths must write zero there.
    let values = vec![3i32, 99, -7, 1 << 20, -12];
    let validity = BitVec::from_bools([true, false, true, true, false]);
    let typed = MemoryTable::new()
        .with_typed("x", values.clone(), Some(validity.clone()))
        .unwrap();
    let dynamic = MemoryTable::new()
        .with_values(
            "x",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| if validity.get(i) { Value::from(*v) } else { Value::Null })
                .collect(),
        )
        .unwrap();

    let fast = encode(&typed, &EncodeOptions::default()).unwrap();
    let slow = encode(&dynamic, &EncodeOptions::default().with_type("x", "int32")).unwrap();
    let (fast, slow) = (fast.column("x").unwrap().data(), slow.column("x").unwrap().data());

    assert_eq!(fast.data_type(), slow.data_type());
    assert_eq!(fast.null_count(), 2);
    assert_eq!(fast.validity(), slow.validity());
    assert_eq!(fast.buffers(), slow.buffers());
    assert_eq!(
        fast.buffers()[0].typed_values::<i32>(5),
        vec![3, 0, -7, 1 << 20, 0]
    );
}

#[test]
fn filtered_and_ordered_views_use_the_row_scan() {
    let base = MemoryTable::new()
        .with_typed("x", vec![10u32, 20, 30, 40], None)
        .unwrap()
        .with_values("s", ["a", "b", "c", "d"].into_iter().map(Value::from).collect())
        .unwrap();
    let view = base
        .filter(BitVec::from_bools([true, false, true, true]))
        .order_by(vec![3, 2, 1, 0]);

    let table = encode(&view, &EncodeOptions::default()).unwrap();
    assert_eq!(table.num_rows(), 3);
    let x = table.column("x").unwrap();
    assert_eq!(x.data_type(), &DataType::UInt32);
    assert_eq!(x.data().buffers()[0].typed_values::<u32>(3), vec![40, 30, 10]);
    assert_eq!(
        utf8_values(&table, "s"),
        vec![Some("d".to_owned()), Some("c".to_owned()), Some("a".to_owned())]
    );
}

#[test]
fn nullability_follows_the_source() {
    // Typed storage without a null channel stays non-nullable when rebuilt.
    let table = MemoryTable::new()
        .with_typed("x", vec![1i16, 2], None)
        .unwrap()
        .filter(BitVec::from_bools([true, true]));
    let encoded = encode(&table, &EncodeOptions::default().with_type("x", "int64")).unwrap();
    let x = encoded.column("x").unwrap();
    assert_eq!(x.data_type(), &DataType::Int64);
    assert!(!x.field().nullable);

    // Explicitly typed dynamic values may always hold nulls.
    let table = MemoryTable::new()
        .with_values("x", vec![Value::from(1), Value::Null])
        .unwrap();
    let encoded = encode(&table, &EncodeOptions::default().with_type("x", "uint16")).unwrap();
    let x = encoded.column("x").unwrap();
    assert!(x.field().nullable);
    assert_eq!(x.null_count(), 1);
}

#[test]
fn nested_values_need_an_explicit_type() {
    let rows = vec![
        Record::new().with("tags", vec![Value::from("a"), Value::from("b")]),
        Record::new().with("tags", Value::Null),
        Record::new().with("tags", vec![Value::from("c")]),
    ];
    assert!(matches!(
        encode_rows(&rows, &EncodeOptions::default()),
        Err(EncodeError::NestedTypeRequired)
    ));

    let table = encode_rows(&rows, &EncodeOptions::default().with_type("tags", "list<utf8>")).unwrap();
    let tags = table.column("tags").unwrap().data();
    assert_eq!(tags.null_count(), 1);
    assert_eq!(tags.buffers()[0].typed_values::<i32>(4), vec![0, 2, 2, 3]);
    assert_eq!(tags.children()[0].len(), 3);
}

#[test]
fn struct_columns_from_records() {
    let rows = vec![
        Record::new().with("p", Record::new().with("x", 1).with("label", "one")),
        Record::new().with("p", Record::new().with("x", 2)),
    ];
    let options = EncodeOptions::default().with_type("p", "struct<x: int32, label: utf8>");
    let table = encode_rows(&rows, &options).unwrap();
    let p = table.column("p").unwrap().data();
    assert_eq!(p.children().len(), 2);
    assert_eq!(p.children()[0].buffers()[0].typed_values::<i32>(2), vec![1, 2]);
    assert_eq!(p.children()[1].null_count(), 1);
}

#[test]
fn unknown_columns_and_type_names_are_errors() {
    let rows = column_rows("x", [Value::from(1)]);
    assert!(matches!(
        encode_rows(&rows, &EncodeOptions::default().with_columns(["y"]))
            .map(|t| t.column("y").map(|c| c.null_count())),
        Ok(Some(1))
    ));

    let table = MemoryTable::new().with_values("x", vec![Value::from(1)]).unwrap();
    assert!(matches!(
        encode(&table, &EncodeOptions::default().with_columns(["y"])),
        Err(EncodeError::UnknownColumn(name)) if name == "y"
    ));
    assert!(matches!(
        encode(&table, &EncodeOptions::default().with_type("x", "decimal")),
        Err(EncodeError::UnknownTypeName(_))
    ));
}

/// A source whose scan stops one row short of its reported row count.
struct ShortScan {
    values: Vec<Value>,
}

struct ShortColumn<'a>(&'a [Value]);

impl SourceColumn for ShortColumn<'_> {
    fn get(&self, row: usize) -> Value {
        self.0[row].clone()
    }

    fn storage(&self) -> ColumnStorage<'_> {
        ColumnStorage::Opaque
    }
}

impl SourceTable for ShortScan {
    fn row_count(&self) -> usize {
        self.values.len() + 1
    }

    fn column_names(&self) -> Vec<String> {
        vec!["x".to_owned()]
    }

    fn column(&self, _name: &str) -> Option<Box<dyn SourceColumn + '_>> {
        Some(Box::new(ShortColumn(&self.values)))
    }

    fn scan(
        &self,
        visit: &mut dyn FnMut(usize) -> formula_arrow::EncodeResult<()>,
        _ordered: bool,
        limit: usize,
        offset: usize,
    ) -> formula_arrow::EncodeResult<()> {
        for row in (offset..self.values.len()).take(limit) {
            visit(row)?;
        }
        Ok(())
    }
}

#[test]
fn short_columns_abort_the_table() {
    let source = ShortScan {
        values: vec![Value::from(1), Value::from(2)],
    };
    let err = encode(&source, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::ColumnLengthMismatch { ref column, expected: 3, actual: 2 } if column == "x"
    ));
    assert_eq!(
        err.to_string(),
        "column length mismatch for x: expected 3 rows, got 2"
    );
}
