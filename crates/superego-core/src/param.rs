//! Typed, recursive parameter tree used for [`crate::request::ToolRequest::parameters`].
//!
//! Modeled as a proper tagged sum, rather than an untyped JSON blob, so
//! that untyped values never escape the sanitization boundary.

use crate::sanitize::{bound_len, strip_control_chars, DEFAULT_STRING_CAP};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum number of elements kept from a source array.
pub const MAX_ARRAY_LEN: usize = 100;

/// A single parameter value: string, number, bool, array, or map of the same.
///
/// `Object` uses a `BTreeMap` (not `HashMap`) so that canonical
/// (sorted-key) serialization — required for a deterministic `sample`
/// cache key — falls out of `serde_json`'s default map ordering instead
/// of needing a second encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// UTF-8 string, already control-char-stripped and length-bounded.
    Str(String),
    /// Numeric value (kept as `f64`; integers round-trip exactly up to 2^53).
    Num(f64),
    /// Boolean value.
    Bool(bool),
    /// Ordered array, bounded to [`MAX_ARRAY_LEN`] elements.
    Array(Vec<ParamValue>),
    /// Key-sorted map; keys must match `^[A-Za-z_][A-Za-z0-9_]*$`.
    Object(BTreeMap<String, ParamValue>),
    /// JSON null.
    Null,
}

/// Regex-free key validity check: ASCII identifier, leading letter/underscore.
fn is_valid_key(k: &str) -> bool {
    let mut chars = k.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ParamValue {
    /// Build a sanitized `ParamValue` tree from an arbitrary `serde_json::Value`,
    /// applying the §4.C bounds: 1 KiB per string, [`MAX_ARRAY_LEN`] elements
    /// per array, and dropping object keys that are not valid identifiers.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Num(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => {
                Self::Str(bound_len(&strip_control_chars(s), DEFAULT_STRING_CAP))
            }
            Value::Array(items) => Self::Array(
                items.iter().take(MAX_ARRAY_LEN).map(Self::from_json).collect(),
            ),
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    if is_valid_key(k) {
                        out.insert(k.clone(), Self::from_json(v));
                    }
                }
                Self::Object(out)
            }
        }
    }

    /// Approximate serialized size in bytes, used to enforce the 64 KiB
    /// total-size bound on a parameter tree.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }

    /// Render back to a plain `serde_json::Value`, e.g. for prompt rendering
    /// or wire responses.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_invalid_keys() {
        let v = json!({"ok_key": 1, "1bad": 2, "also-bad": 3, "_under": 4});
        let p = ParamValue::from_json(&v);
        let obj = match p {
            ParamValue::Object(m) => m,
            _ => panic!("expected object"),
        };
        assert!(obj.contains_key("ok_key"));
        assert!(obj.contains_key("_under"));
        assert!(!obj.contains_key("1bad"));
        assert!(!obj.contains_key("also-bad"));
    }

    #[test]
    fn bounds_array_length() {
        let items: Vec<Value> = (0..500).map(|i| json!(i)).collect();
        let v = ParamValue::from_json(&json!(items));
        match v {
            ParamValue::Array(a) => assert_eq!(a.len(), MAX_ARRAY_LEN),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn bounds_string_length_and_strips_control_chars() {
        let long = "x".repeat(2000);
        let v = ParamValue::from_json(&json!(format!("{long}\u{0}")));
        match v {
            ParamValue::Str(s) => assert!(s.len() <= DEFAULT_STRING_CAP),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn object_serializes_with_sorted_keys() {
        let v = json!({"b": 1, "a": 2});
        let p = ParamValue::from_json(&v);
        let s = serde_json::to_string(&p).unwrap();
        assert!(s.find("\"a\"").unwrap() < s.find("\"b\"").unwrap());
    }
}
