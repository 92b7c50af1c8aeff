use serde_json::Value;

use super::cell;

/// Print just the key answer of the output.
///
/// Receipts and loans print the remaining balance, summaries the total
/// debt, schedule previews the monthly installment. Lists print one loan
/// id per line.
pub fn print_minimal(value: &Value) {
    if let Value::Array(items) = value {
        for item in items {
            match item.get("id") {
                Some(id) => println!("{}", cell(id)),
                None => println!("{}", cell(item)),
            }
        }
        return;
    }

    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "remainingBalance",
        "totalDebt",
        "monthlyInstallment",
        "outcome",
        "deleted",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", cell(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result_obj));
}
