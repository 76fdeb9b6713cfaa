//! Nested-to-flat transform for dashboard items.
//!
//! Collapses an arbitrarily nested JSON tree into a single-level map with
//! underscore-joined path keys, suitable for wide key/value table rows.

use serde_json::{Map, Value};

/// Convert an arbitrary map key into a storage-friendly flat key.
///
/// Any character outside alphanumeric-or-underscore becomes an underscore,
/// leading/trailing underscores are trimmed, and an empty result falls back
/// to the literal `value`.
pub fn sanitize_flat_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect();

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "value".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Recursively merge `data` into `target` using underscore-joined keys.
///
/// Nested objects recurse with the extended prefix. Lists emit one entry per
/// element under an index-suffixed key: object elements recurse, list
/// elements recurse with the index folded into the prefix (so arbitrary
/// nesting depth stays representable), and scalar elements are stored
/// directly. Scalars are stored under the prefixed key as-is.
pub fn flatten_into(target: &mut Map<String, Value>, data: &Map<String, Value>, prefix: &str) {
    for (key, value) in data {
        let sanitized = sanitize_flat_key(key);
        let new_key = if prefix.is_empty() {
            sanitized
        } else {
            format!("{prefix}_{sanitized}")
        };

        match value {
            Value::Object(nested) => flatten_into(target, nested, &new_key),
            Value::Array(items) => flatten_list(target, items, &new_key),
            scalar => {
                target.insert(new_key, scalar.clone());
            }
        }
    }
}

/// Flatten `data` into a fresh map.
pub fn flatten(data: &Map<String, Value>) -> Map<String, Value> {
    let mut target = Map::new();
    flatten_into(&mut target, data, "");
    target
}

fn flatten_list(target: &mut Map<String, Value>, items: &[Value], key: &str) {
    for (i, elem) in items.iter().enumerate() {
        let indexed_key = format!("{key}_{i}");
        match elem {
            Value::Object(nested) => flatten_into(target, nested, &indexed_key),
            Value::Array(inner) => flatten_list(target, inner, &indexed_key),
            scalar => {
                target.insert(indexed_key, scalar.clone());
            }
        }
    }
}
