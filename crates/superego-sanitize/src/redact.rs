//! Key-based redaction of sensitive parameter values, applied before a
//! request is written into an audit entry or handed to an inference
//! provider.
//!
//! A configurable set of case-insensitive key patterns, rather than a
//! fixed header allowlist, so operators can extend coverage beyond the
//! built-in defaults without a code change.

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde_json::Value;
use superego_core::ParamValue;

/// Placeholder substituted for a redacted value.
pub const REDACTED_PLACEHOLDER: &str = "***";

/// The illustrative default sensitive-key patterns: common secret/credential
/// field names, matched case-insensitively against object keys.
pub const DEFAULT_SENSITIVE_KEY_PATTERNS: &[&str] = &[
    r"(?i)^password$",
    r"(?i)^passwd$",
    r"(?i)secret",
    r"(?i)token",
    r"(?i)api[_-]?key",
    r"(?i)authorization",
    r"(?i)^cookie$",
    r"(?i)private[_-]?key",
    r"(?i)access[_-]?key",
    r"(?i)credential",
];

static DEFAULT_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(DEFAULT_SENSITIVE_KEY_PATTERNS).expect("default sensitive-key patterns are valid")
});

/// A configurable set of sensitive-key matchers.
#[derive(Clone)]
pub struct Redactor {
    set: RegexSet,
}

impl Default for Redactor {
    fn default() -> Self {
        Self { set: DEFAULT_SET.clone() }
    }
}

impl Redactor {
    /// Build a redactor from a caller-supplied list of regex patterns,
    /// replacing (not extending) the built-in defaults.
    pub fn from_patterns(patterns: &[String]) -> Result<Self, regex::Error> {
        Ok(Self { set: RegexSet::new(patterns)? })
    }

    /// Whether `key` should be treated as sensitive.
    #[must_use]
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        self.set.is_match(key)
    }

    /// Return a copy of `value` with every sensitive key's value replaced by
    /// [`REDACTED_PLACEHOLDER`], recursing into nested arrays/objects.
    #[must_use]
    pub fn redact_param_tree(&self, value: &ParamValue) -> ParamValue {
        match value {
            ParamValue::Object(map) => {
                let mut out = std::collections::BTreeMap::new();
                for (k, v) in map {
                    if self.is_sensitive_key(k) {
                        out.insert(k.clone(), ParamValue::Str(REDACTED_PLACEHOLDER.to_string()));
                    } else {
                        out.insert(k.clone(), self.redact_param_tree(v));
                    }
                }
                ParamValue::Object(out)
            }
            ParamValue::Array(items) => {
                ParamValue::Array(items.iter().map(|v| self.redact_param_tree(v)).collect())
            }
            other => other.clone(),
        }
    }

    /// Same as [`Redactor::redact_param_tree`] but operating on a plain
    /// `serde_json::Value`, for call sites that have not yet converted to
    /// the typed tree (e.g. hook wire payloads).
    #[must_use]
    pub fn redact_json(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    if self.is_sensitive_key(k) {
                        out.insert(k.clone(), Value::String(REDACTED_PLACEHOLDER.to_string()));
                    } else {
                        out.insert(k.clone(), self.redact_json(v));
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact_json(v)).collect()),
            other => other.clone(),
        }
    }
}
