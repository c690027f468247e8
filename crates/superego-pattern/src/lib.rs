//! Multi-dialect pattern matching for security rule conditions.
//!
//! [`Engine::match_conditions`] evaluates a [`superego_core::rule::Conditions`]
//! tree against a [`superego_core::ToolRequest`]: the five named request
//! fields (`tool_name`, `parameters`, `cwd`, `session_id`, `agent_id`) and
//! `time_range` are leaf predicates, matched using the condition's declared
//! dialect (`string`, `regex`, `glob`, `jsonpath`); `all_of`, `any_of`, and
//! `not` nest sub-trees into AND/OR/NOT combinators.

pub mod cache;
pub mod canonical;
pub mod dialect;
pub mod error;
pub mod jsonpath;
pub mod path;

pub use cache::PatternCache;
pub use dialect::Dialect;
pub use error::PatternError;

use serde_json::Value;
use superego_core::rule::{Conditions, TimeRange};
use superego_core::ToolRequest;

/// The pattern matching engine: a cheap, cloneable handle around shared,
/// bounded caches.
#[derive(Clone, Default)]
pub struct Engine {
    cache: PatternCache,
}

impl Engine {
    /// Build an engine with default cache capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine with explicit cache capacities.
    #[must_use]
    pub fn with_capacities(compiled_capacity: usize, result_capacity: usize) -> Self {
        Self { cache: PatternCache::new(compiled_capacity, result_capacity) }
    }

    /// Evaluate every predicate and combinator in `conditions` against
    /// `request`, returning whether it matched plus the dotted labels of
    /// every leaf/combinator that contributed to the match (e.g.
    /// `"tool_name"`, `"any_of[1].cwd"`, `"not"`). Labels are only
    /// collected along the path that actually matched; a failed `any_of`
    /// branch contributes nothing.
    pub fn match_conditions(
        &self,
        conditions: &Conditions,
        request: &ToolRequest,
    ) -> Result<(bool, Vec<String>), PatternError> {
        self.match_conditions_labeled(conditions, request, "")
    }

    fn match_conditions_labeled(
        &self,
        conditions: &Conditions,
        request: &ToolRequest,
        prefix: &str,
    ) -> Result<(bool, Vec<String>), PatternError> {
        let mut matched_leaves = Vec::new();

        macro_rules! check_field {
            ($field:ident, $name:literal) => {
                if let Some(leaf) = &conditions.$field {
                    if !self.eval_field($name, leaf, request)? {
                        return Ok((false, matched_leaves));
                    }
                    matched_leaves.push(format!("{prefix}{}", $name));
                }
            };
        }
        check_field!(tool_name, "tool_name");
        check_field!(parameters, "parameters");
        check_field!(cwd, "cwd");
        check_field!(session_id, "session_id");
        check_field!(agent_id, "agent_id");

        if let Some(range) = &conditions.time_range {
            if !eval_time_range(range, request) {
                return Ok((false, matched_leaves));
            }
            matched_leaves.push(format!("{prefix}time_range"));
        }

        for (i, nested) in conditions.all_of.iter().enumerate() {
            let nested_prefix = format!("{prefix}all_of[{i}].");
            let (matched, mut leaves) =
                self.match_conditions_labeled(nested, request, &nested_prefix)?;
            if !matched {
                return Ok((false, matched_leaves));
            }
            matched_leaves.append(&mut leaves);
        }

        if !conditions.any_of.is_empty() {
            let mut any_matched = false;
            for (i, nested) in conditions.any_of.iter().enumerate() {
                let nested_prefix = format!("{prefix}any_of[{i}].");
                let (matched, mut leaves) =
                    self.match_conditions_labeled(nested, request, &nested_prefix)?;
                if matched {
                    any_matched = true;
                    matched_leaves.append(&mut leaves);
                    break;
                }
            }
            if !any_matched {
                return Ok((false, matched_leaves));
            }
        }

        if let Some(nested) = &conditions.not {
            let nested_prefix = format!("{prefix}not.");
            let (matched, _) = self.match_conditions_labeled(nested, request, &nested_prefix)?;
            if matched {
                return Ok((false, matched_leaves));
            }
            matched_leaves.push(format!("{prefix}not"));
        }

        Ok((true, matched_leaves))
    }

    /// Resolve `field` against `request` and match it against `leaf`. A
    /// `jsonpath` leaf resolves its pattern as a path into the field's
    /// value, then matches the leaf found there as `string` by default, or
    /// via a nested `match:` dialect; any other dialect stringifies the
    /// resolved value directly.
    fn eval_field(
        &self,
        field: &str,
        leaf: &superego_core::rule::ConditionLeaf,
        request: &ToolRequest,
    ) -> Result<bool, PatternError> {
        let resolved = path::resolve_field(request, field);

        if leaf.dialect() == "jsonpath" {
            let root = resolved.unwrap_or(Value::Null);
            let Some(value) = jsonpath::resolve(&root, leaf.value()).cloned() else {
                return Ok(false);
            };
            if value.is_null() {
                return Ok(false);
            }
            return match leaf.nested_match() {
                None => Ok(true),
                Some(nested) => self.match_value(&value, &nested.dialect, &nested.value),
            };
        }

        let Some(value) = resolved else { return Ok(false) };
        self.match_value(&value, leaf.dialect(), leaf.value())
    }

    /// Match a resolved JSON leaf against `dialect_name`/`pattern`, going
    /// through the compiled-pattern and result caches.
    fn match_value(
        &self,
        value: &Value,
        dialect_name: &str,
        pattern: &str,
    ) -> Result<bool, PatternError> {
        let dialect = Dialect::parse(dialect_name)?;
        let input = path::stringify(value);

        let compiled_id = cache::hash_str(&format!("{dialect:?}:{pattern}"));
        let value_hash = cache::hash_str(&input);
        if let Some(cached) = self.cache.result(compiled_id, value_hash) {
            return Ok(cached);
        }

        let compiled = self.cache.compiled(dialect, pattern)?;
        let matched = dialect::matches_str(&compiled, &input)?;
        self.cache.put_result(compiled_id, value_hash, matched);
        Ok(matched)
    }

    /// Drop all cached compiled patterns and results. Call after a
    /// `RuleSet` swap.
    pub fn flush_caches(&self) {
        self.cache.flush();
    }
}

fn eval_time_range(range: &TimeRange, request: &ToolRequest) -> bool {
    range.contains(request.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use superego_core::rule::{ConditionLeaf, TypedLeaf};

    fn leaf(dialect: &str, value: &str) -> ConditionLeaf {
        ConditionLeaf::Typed(TypedLeaf {
            dialect: dialect.to_string(),
            value: value.to_string(),
            nested_match: None,
        })
    }

    #[test]
    fn string_condition_matches_tool_name() {
        let engine = Engine::new();
        let req = ToolRequest::new("delete_file", json!({}), "/tmp", "s", "a").unwrap();
        let mut conditions = Conditions::default();
        conditions.tool_name = Some(leaf("string", "delete_file"));
        let (matched, leaves) = engine.match_conditions(&conditions, &req).unwrap();
        assert!(matched);
        assert_eq!(leaves, vec!["tool_name".to_string()]);
    }

    #[test]
    fn bare_string_leaf_matches_like_typed_string() {
        let engine = Engine::new();
        let req = ToolRequest::new("ls", json!({}), "/tmp", "s", "a").unwrap();
        let mut conditions = Conditions::default();
        conditions.tool_name = Some(ConditionLeaf::Bare("ls".to_string()));
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);
    }

    #[test]
    fn regex_condition_matches_parameter() {
        let engine = Engine::new();
        let req =
            ToolRequest::new("write_file", json!({"path": "/etc/shadow"}), "/tmp", "s", "a")
                .unwrap();
        let mut conditions = Conditions::default();
        conditions.parameters = Some(leaf("regex", "/etc/.*"));
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);
    }

    #[test]
    fn every_populated_field_must_match() {
        let engine = Engine::new();
        let req =
            ToolRequest::new("write_file", json!({"path": "/etc/shadow"}), "/tmp", "s", "a")
                .unwrap();
        let mut conditions = Conditions::default();
        conditions.tool_name = Some(leaf("string", "write_file"));
        conditions.cwd = Some(leaf("string", "/tmp"));
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);

        let mut conditions_fail = Conditions::default();
        conditions_fail.tool_name = Some(leaf("string", "write_file"));
        conditions_fail.cwd = Some(leaf("string", "/home"));
        assert!(!engine.match_conditions(&conditions_fail, &req).unwrap().0);
    }

    #[test]
    fn any_of_matches_if_one_branch_matches() {
        let engine = Engine::new();
        let req = ToolRequest::new("bash", json!({}), "/tmp", "s", "a").unwrap();
        let mut a = Conditions::default();
        a.tool_name = Some(leaf("string", "ls"));
        let mut b = Conditions::default();
        b.tool_name = Some(leaf("string", "bash"));
        let mut conditions = Conditions::default();
        conditions.any_of = vec![a, b];
        let (matched, leaves) = engine.match_conditions(&conditions, &req).unwrap();
        assert!(matched);
        assert_eq!(leaves, vec!["any_of[1].tool_name".to_string()]);
    }

    #[test]
    fn all_of_requires_every_branch() {
        let engine = Engine::new();
        let req = ToolRequest::new("bash", json!({"command": "rm -rf /"}), "/tmp", "s", "a")
            .unwrap();
        let mut a = Conditions::default();
        a.tool_name = Some(leaf("string", "bash"));
        let mut b = Conditions::default();
        b.parameters = Some(leaf("regex", "rm -rf"));
        let mut conditions = Conditions::default();
        conditions.all_of = vec![a.clone(), b.clone()];
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);

        let mut c = Conditions::default();
        c.tool_name = Some(leaf("string", "ls"));
        let mut conditions_fail = Conditions::default();
        conditions_fail.all_of = vec![c, b];
        assert!(!engine.match_conditions(&conditions_fail, &req).unwrap().0);
    }

    #[test]
    fn not_inverts_nested_match() {
        let engine = Engine::new();
        let req = ToolRequest::new("ls", json!({}), "/tmp", "s", "a").unwrap();
        let mut inner = Conditions::default();
        inner.tool_name = Some(leaf("string", "bash"));
        let mut conditions = Conditions::default();
        conditions.not = Some(Box::new(inner));
        let (matched, leaves) = engine.match_conditions(&conditions, &req).unwrap();
        assert!(matched);
        assert_eq!(leaves, vec!["not".to_string()]);
    }

    #[test]
    fn time_range_bounds_are_inclusive() {
        let engine = Engine::new();
        let req = ToolRequest::new("ls", json!({}), "/tmp", "s", "a").unwrap();
        let now = req.timestamp();
        let mut conditions = Conditions::default();
        conditions.time_range = Some(TimeRange {
            start: Some(now - chrono::Duration::seconds(1)),
            end: Some(now + chrono::Duration::seconds(1)),
        });
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);

        let mut conditions_fail = Conditions::default();
        conditions_fail.time_range = Some(TimeRange {
            start: Some(now + chrono::Duration::seconds(60)),
            end: None,
        });
        assert!(!engine.match_conditions(&conditions_fail, &req).unwrap().0);
    }

    #[test]
    fn jsonpath_condition_checks_leaf_presence() {
        let engine = Engine::new();
        let req = ToolRequest::new(
            "write_file",
            json!({"files": [{"name": "a.txt"}]}),
            "/tmp",
            "s",
            "a",
        )
        .unwrap();
        let mut present = Conditions::default();
        present.parameters = Some(leaf("jsonpath", "files[0].name"));
        assert!(engine.match_conditions(&present, &req).unwrap().0);

        let mut missing = Conditions::default();
        missing.parameters = Some(leaf("jsonpath", "files[5].name"));
        assert!(!engine.match_conditions(&missing, &req).unwrap().0);
    }

    #[test]
    fn jsonpath_nested_match_applies_dialect_to_resolved_leaf() {
        let engine = Engine::new();
        let req = ToolRequest::new(
            "write_file",
            json!({"files": [{"name": "a.txt"}]}),
            "/tmp",
            "s",
            "a",
        )
        .unwrap();
        let mut conditions = Conditions::default();
        conditions.parameters = Some(ConditionLeaf::Typed(TypedLeaf {
            dialect: "jsonpath".to_string(),
            value: "files[0].name".to_string(),
            nested_match: Some(Box::new(TypedLeaf {
                dialect: "glob".to_string(),
                value: "*.txt".to_string(),
                nested_match: None,
            })),
        }));
        assert!(engine.match_conditions(&conditions, &req).unwrap().0);

        let mut mismatch = conditions.clone();
        mismatch.parameters = Some(ConditionLeaf::Typed(TypedLeaf {
            dialect: "jsonpath".to_string(),
            value: "files[0].name".to_string(),
            nested_match: Some(Box::new(TypedLeaf {
                dialect: "glob".to_string(),
                value: "*.md".to_string(),
                nested_match: None,
            })),
        }));
        assert!(!engine.match_conditions(&mismatch, &req).unwrap().0);
    }

    #[test]
    fn missing_field_never_matches() {
        let engine = Engine::new();
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let mut conditions = Conditions::default();
        conditions.parameters = Some(ConditionLeaf::Typed(TypedLeaf {
            dialect: "jsonpath".to_string(),
            value: "nonexistent".to_string(),
            nested_match: None,
        }));
        assert!(!engine.match_conditions(&conditions, &req).unwrap().0);
    }
}
