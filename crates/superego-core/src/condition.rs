//! The map-based condition tree a rule's `conditions` field is built from:
//! a fixed set of named predicates over request fields, a `time_range`
//! predicate, and the `all_of`/`any_of`/`not` boolean combinators.
//!
//! `Conditions` is a plain struct with one optional field per predicate
//! name rather than a dynamic map, since the key set is fixed and finite —
//! this lets derived `Deserialize` reject an unrecognized key the same way
//! it would reject a misspelled struct field, and keeps `all_of`/`any_of`
//! distinguishable from each other (both hold the same `Vec<Conditions>`
//! shape, so only the field name tells them apart).

use serde::{Deserialize, Serialize};

/// A single typed leaf: a dialect plus the pattern text to match with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedLeaf {
    /// Matching dialect: `string`, `regex`, `glob`, or `jsonpath`.
    #[serde(rename = "type")]
    pub dialect: String,
    /// The raw pattern text, interpreted per `dialect`.
    pub value: String,
    /// For a `jsonpath` leaf only: an optional nested dialect/pattern the
    /// resolved value is matched against, instead of the default
    /// non-null presence check.
    #[serde(rename = "match", default)]
    pub nested_match: Option<Box<TypedLeaf>>,
}

/// A condition leaf as it appears in a rules file: either a bare string
/// (shorthand for `{type: string, value: <string>}`) or a fully spelled out
/// typed leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionLeaf {
    /// Shorthand for `{type: string, value: <string>}`.
    Bare(String),
    /// Fully spelled out `{type, value}` (and, for `jsonpath`, `match`).
    Typed(TypedLeaf),
}

impl ConditionLeaf {
    /// The dialect this leaf matches with (`"string"` for the bare form).
    #[must_use]
    pub fn dialect(&self) -> &str {
        match self {
            Self::Bare(_) => "string",
            Self::Typed(leaf) => &leaf.dialect,
        }
    }

    /// The raw pattern text.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Bare(s) => s,
            Self::Typed(leaf) => &leaf.value,
        }
    }

    /// The nested `match:` leaf, if any (`jsonpath` only).
    #[must_use]
    pub fn nested_match(&self) -> Option<&TypedLeaf> {
        match self {
            Self::Bare(_) => None,
            Self::Typed(leaf) => leaf.nested_match.as_deref(),
        }
    }
}

/// An inclusive UTC time window a request's timestamp is checked against;
/// either bound may be omitted for an open-ended range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound; unbounded below if absent.
    #[serde(default)]
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    /// Inclusive upper bound; unbounded above if absent.
    #[serde(default)]
    pub end: Option<chrono::DateTime<chrono::Utc>>,
}

impl TimeRange {
    /// Whether `at` falls within `[start, end]`.
    #[must_use]
    pub fn contains(&self, at: chrono::DateTime<chrono::Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// A rule's `conditions` map: the fixed predicate keys spec §3 enumerates,
/// plus the `all_of`/`any_of`/`not` boolean combinators. Every populated
/// field at the same nesting level is AND-ed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Matches against the request's tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<ConditionLeaf>,
    /// Matches against the request's parameter tree, stringified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ConditionLeaf>,
    /// Matches against the request's working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<ConditionLeaf>,
    /// Matches against the request's session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<ConditionLeaf>,
    /// Matches against the request's agent identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<ConditionLeaf>,
    /// Matches if the request's timestamp falls within the given window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Every nested `Conditions` must match (logical AND).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Conditions>,
    /// At least one nested `Conditions` must match (logical OR).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Conditions>,
    /// The nested `Conditions` must not match (logical NOT).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Conditions>>,
}

impl Conditions {
    /// Whether this node declares no predicate of any kind. A rules file
    /// rejects a rule whose top-level `conditions` is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tool_name.is_none()
            && self.parameters.is_none()
            && self.cwd.is_none()
            && self.session_id.is_none()
            && self.agent_id.is_none()
            && self.time_range.is_none()
            && self.all_of.is_empty()
            && self.any_of.is_empty()
            && self.not.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_leaf_is_string_dialect() {
        let leaf = ConditionLeaf::Bare("write".to_string());
        assert_eq!(leaf.dialect(), "string");
        assert_eq!(leaf.value(), "write");
    }

    #[test]
    fn default_conditions_is_empty() {
        assert!(Conditions::default().is_empty());
    }

    #[test]
    fn populated_field_is_not_empty() {
        let mut c = Conditions::default();
        c.tool_name = Some(ConditionLeaf::Bare("ls".to_string()));
        assert!(!c.is_empty());
    }

    #[test]
    fn time_range_open_ended_bounds() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let only_start = TimeRange { start: Some(now), end: None };
        assert!(only_start.contains(now + chrono::Duration::days(1)));
        assert!(!only_start.contains(now - chrono::Duration::days(1)));
    }
}
