//! Canonical JSON - deterministic bytes for hashing and signing.
//!
//! Object keys are emitted in sorted order at every nesting level, so the
//! same logical value always hashes identically regardless of insertion
//! order. Arrays keep their order; order is meaningful there.

use serde_json::{Map, Value};

/// Serialize a JSON value with sorted keys.
pub fn canonical_string(value: &Value) -> String {
    sort_value(value).to_string()
}

/// Canonical bytes, ready for a hasher.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    canonical_string(value).into_bytes()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}
