#![no_main]

use libfuzzer_sys::fuzz_target;

use formula_arrow::{encode_json, EncodeOptions, Table};

/// Keep inputs small enough that a single case never builds huge columns.
const MAX_INPUT_BYTES: usize = 64 * 1024;

fn check_shape(table: &Table) {
    for column in table.columns() {
        assert_eq!(column.len(), table.num_rows(), "column {}", column.name());
        let data = column.data();
        for buffer in data.buffers() {
            assert_eq!(buffer.len() % formula_arrow::ALIGNMENT, 0);
        }
        if data.validity().is_some() {
            assert!(data.null_count() > 0);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_BYTES {
        return;
    }
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Errors are expected for mixed inputs; panics are not.
    let options = EncodeOptions::default().with_limit(data.first().copied().unwrap_or(0) as usize);
    if let Ok(table) = encode_json(&json, &EncodeOptions::default()) {
        check_shape(&table);
        let again = encode_json(&json, &EncodeOptions::default()).expect("second encode");
        assert_eq!(table, again);
    }
    if let Ok(table) = encode_json(&json, &options) {
        check_shape(&table);
    }
});
