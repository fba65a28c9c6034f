//! JSON payload field extraction.

use serde_json::Value;

/// Parse a payload string as JSON, returning `None` when it is not valid
/// JSON.
pub fn parse_json(payload: &str) -> Option<Value> {
    serde_json::from_str(payload).ok()
}

/// Extract every field path of a JSON structure in dot notation.
///
/// Arrays are flattened without indices: `{"a": [{"b": 1}]}` yields
/// `["a", "a.b"]`, so two different positions in an array are
/// indistinguishable.
pub fn payload_paths(payload: &Value) -> Vec<String> {
    match payload {
        Value::Array(items) => items.iter().flat_map(payload_paths).collect(),
        Value::Object(fields) => {
            let mut paths = Vec::new();
            for (field, value) in fields {
                paths.push(field.clone());
                for nested in payload_paths(value) {
                    paths.push(format!("{field}.{nested}"));
                }
            }
            paths
        }
        _ => Vec::new(),
    }
}
