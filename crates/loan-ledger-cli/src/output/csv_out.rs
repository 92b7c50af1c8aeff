use serde_json::{Map, Value};
use std::io;

use super::{cell, columns};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Lists become one row per record. A single record becomes field/value
/// pairs, except that a record carrying an installment schedule is written
/// as the schedule rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let record = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            match record.get("installments") {
                Some(Value::Array(rows)) if !rows.is_empty() => write_rows(&mut wtr, rows),
                _ => write_pairs(&mut wtr, record),
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&cell(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_pairs(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &cell(val)]);
    }
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers = columns(first);
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&cell(item)]);
        }
    }
}
