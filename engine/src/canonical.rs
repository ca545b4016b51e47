//! Order-stable JSON serialization.
//!
//! Entry bodies, snapshot file contents and composite attribute comparisons
//! all go through [`to_canonical_string`], so identical logical content
//! always produces byte-identical text regardless of which client wrote it.

use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize `value` as compact JSON with every object's keys sorted.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// Canonical text of an already-built JSON value.
pub fn canonical_value_string(value: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are always strings.
    serde_json::to_string(&canonicalize(value.clone())).unwrap_or_default()
}

/// Rebuild `value` so that object keys are inserted in sorted order.
///
/// `serde_json::Map` is sorted already unless `preserve_order` is enabled
/// somewhere in the dependency graph; rebuilding keeps the output stable
/// in both cases.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_at_every_level() {
        let value = json!({"b": 1, "a": {"z": [ {"y": 1, "x": 2} ], "c": null}});
        assert_eq!(
            canonical_value_string(&value),
            r#"{"a":{"c":null,"z":[{"x":2,"y":1}]},"b":1}"#
        );
    }

    #[test]
    fn struct_field_order_does_not_leak() {
        #[derive(Serialize)]
        struct Unordered {
            zeta: u8,
            alpha: u8,
        }

        let text = to_canonical_string(&Unordered { zeta: 1, alpha: 2 }).unwrap();
        assert_eq!(text, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn array_order_is_preserved() {
        assert_eq!(canonical_value_string(&json!([3, 1, 2])), "[3,1,2]");
    }
}
