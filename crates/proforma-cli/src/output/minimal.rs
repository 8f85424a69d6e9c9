use serde_json::Value;

use super::{lookup, result_of, scalar_text};

/// Headline figure of each command, in order of priority.
const PRIORITY_PATHS: [&str; 6] = [
    "kpi.irr.rate",
    "kpi.irr.status",
    "rate",
    "status",
    "monthly_payment",
    "version",
];

/// Print just the key answer value from the output.
///
/// A proforma prints its IRR (or the undetermined marker) followed by the
/// health rating; other commands print their single headline figure.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    for path in PRIORITY_PATHS {
        if let Some(val) = lookup(result, path) {
            match lookup(result, "leverage.health.rating") {
                Some(rating) => println!("{} {}", scalar_text(val), scalar_text(rating)),
                None => println!("{}", scalar_text(val)),
            }
            return;
        }
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar_text(val));
            return;
        }
    }

    println!("{}", scalar_text(result));
}
