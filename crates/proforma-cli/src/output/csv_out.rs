use serde_json::Value;
use std::io;

use super::{flatten, lookup, result_of, scalar_text};

/// Write output as CSV to stdout.
///
/// Row-shaped results (yearly cash flows, amortization rows) are written one
/// record per row; anything else becomes a two-column `field,value` listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    let rows = lookup(result, "cash_flows").or_else(|| lookup(result, "rows"));
    match rows {
        Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
        _ => {
            let _ = wtr.write_record(["field", "value"]);
            let mut fields = Vec::new();
            flatten("", result, &mut fields);
            for (key, val) in fields {
                let _ = wtr.write_record([key, val]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    // Union of columns in first-seen order; the terminal year carries extra sale fields
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        let mut fields = Vec::new();
        flatten("", row, &mut fields);
        for (key, _) in fields {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }
    if columns.is_empty() {
        return;
    }
    let _ = wtr.write_record(&columns);

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| lookup(row, c).map(scalar_text).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}
