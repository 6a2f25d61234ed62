//! Canonical JSON encoding and generic hash helpers shared by the middleware
//! chain (PII hashing), the sampling policy (config fingerprinting), and the
//! sink adapters (deterministic idempotency/object keys).

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Renders `value` as JSON with object keys sorted and no incidental
/// whitespace, so semantically-identical values always hash identically
/// regardless of field insertion order.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).expect("string always serializes"),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut ordered = BTreeMap::new();
            for (k, v) in map {
                ordered.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> =
                ordered.into_iter().map(|(k, v)| format!("{}:{}", serde_json::to_string(k).expect("key serializes"), v)).collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// Lowercase hex SHA-256 of a UTF-8 string.
pub fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}

/// SHA-256 of the canonicalized JSON value.
pub fn hash_value(v: &Value) -> String {
    hash_str(&to_canonical_json(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_ignores_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(to_canonical_json(&a), to_canonical_json(&b));
    }

    #[test]
    fn hash_value_is_deterministic() {
        let v = json!({"x": [1, 2, 3], "y": "z"});
        assert_eq!(hash_value(&v), hash_value(&v));
    }
}
