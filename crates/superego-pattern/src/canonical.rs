//! Canonical (sorted-key) JSON encoding, used to build deterministic cache
//! keys. `serde_json`'s own `Value` map ordering is insertion-order, not
//! sorted, so a condition's `parameters` subtree needs an explicit canonical
//! pass before hashing, rather than relying on incidental field order.

use serde_json::Value;
use std::collections::BTreeMap;

/// Render `value` as a JSON string with every object's keys sorted
/// recursively, so structurally identical values always hash the same way.
#[must_use]
pub fn canonical_string(value: &Value) -> String {
    serde_json::to_string(&sorted(value)).unwrap_or_default()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted_map: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), sorted(v))).collect();
            serde_json::to_value(sorted_map).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orders_keys_regardless_of_input_order() {
        let a = canonical_string(&json!({"b": 1, "a": 2}));
        let b = canonical_string(&json!({"a": 2, "b": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn orders_nested_keys() {
        let a = canonical_string(&json!({"z": {"y": 1, "x": 2}}));
        let b = canonical_string(&json!({"z": {"x": 2, "y": 1}}));
        assert_eq!(a, b);
    }
}
