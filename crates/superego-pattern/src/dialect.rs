//! The four matching dialects a [`superego_core::rule::ConditionLeaf`] may use.

use crate::error::PatternError;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Maximum input length (bytes) a compiled pattern will be matched against.
/// Inputs longer than this are rejected rather than matched, bounding
/// worst-case evaluation cost even though `regex` is already linear-time.
pub const MAX_MATCH_INPUT_LEN: usize = 8192;

/// A regex's compiled program size limit, in bytes. Rejects pathological
/// patterns (e.g. deeply nested repetition) at compile time.
const REGEX_SIZE_LIMIT: usize = 1 << 20; // 1 MiB

/// The dialect a condition's pattern text is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Exact (case-sensitive) string equality.
    String,
    /// A `regex`-crate regular expression (linear-time, no backtracking).
    Regex,
    /// A shell-style glob (`glob` crate), `**` supported.
    Glob,
    /// A restricted JSONPath expression (dotted/bracket access only);
    /// matches if the expression resolves to any non-null leaf.
    JsonPath,
}

impl Dialect {
    /// Parse a dialect name as it appears in a rule file.
    pub fn parse(name: &str) -> Result<Self, PatternError> {
        match name {
            "string" => Ok(Self::String),
            "regex" => Ok(Self::Regex),
            "glob" => Ok(Self::Glob),
            "jsonpath" => Ok(Self::JsonPath),
            other => Err(PatternError::UnknownDialect(other.to_string())),
        }
    }
}

/// A pattern compiled for its dialect, ready to be matched repeatedly.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Exact string to compare against.
    String(String),
    /// Compiled regular expression.
    Regex(regex::Regex),
    /// Compiled glob pattern.
    Glob(glob::Pattern),
    /// JSONPath expression text (resolved lazily per-request; nothing to
    /// precompile beyond validating it parses into at least one segment).
    JsonPath(String),
}

/// Compile `pattern` for `dialect`, applying the compile-time safety bounds
/// described on [`MAX_MATCH_INPUT_LEN`] and [`REGEX_SIZE_LIMIT`].
pub fn compile(dialect: Dialect, pattern: &str) -> Result<CompiledPattern, PatternError> {
    match dialect {
        Dialect::String => Ok(CompiledPattern::String(pattern.to_string())),
        Dialect::Regex => RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .dfa_size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map(CompiledPattern::Regex)
            .map_err(|e| PatternError::Compile {
                dialect: "regex".to_string(),
                pattern: pattern.to_string(),
                source: e.to_string(),
            }),
        Dialect::Glob => glob::Pattern::new(pattern).map(CompiledPattern::Glob).map_err(|e| {
            PatternError::Compile {
                dialect: "glob".to_string(),
                pattern: pattern.to_string(),
                source: e.to_string(),
            }
        }),
        Dialect::JsonPath => Ok(CompiledPattern::JsonPath(pattern.to_string())),
    }
}

/// Match `compiled` against `input`, a string already resolved from the
/// request (not used for the `JsonPath` dialect, which matches against the
/// raw JSON leaf instead — see `crate::engine`).
pub fn matches_str(compiled: &CompiledPattern, input: &str) -> Result<bool, PatternError> {
    if input.len() > MAX_MATCH_INPUT_LEN {
        return Err(PatternError::InputTooLarge { max: MAX_MATCH_INPUT_LEN });
    }
    let started = std::time::Instant::now();
    let result = match compiled {
        // Case-sensitive substring containment; empty pattern matches
        // empty value only. `contains` alone would make an empty pattern
        // match every input, so that case is carved out explicitly.
        CompiledPattern::String(s) => {
            if s.is_empty() {
                input.is_empty()
            } else {
                input.contains(s.as_str())
            }
        }
        CompiledPattern::Regex(re) => re.is_match(input),
        CompiledPattern::Glob(g) => g.matches(input),
        CompiledPattern::JsonPath(_) => false,
    };
    let elapsed = started.elapsed();
    if elapsed > std::time::Duration::from_millis(50) {
        tracing::warn!(?elapsed, "pattern match exceeded expected wall-clock budget");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_dialect_is_substring_containment() {
        let c = compile(Dialect::String, "rm").unwrap();
        assert!(matches_str(&c, "rm").unwrap());
        assert!(matches_str(&c, "rm -rf").unwrap());
        assert!(!matches_str(&c, "echo hi").unwrap());
    }

    #[test]
    fn empty_string_pattern_matches_only_empty_value() {
        let c = compile(Dialect::String, "").unwrap();
        assert!(matches_str(&c, "").unwrap());
        assert!(!matches_str(&c, "anything").unwrap());
    }

    #[test]
    fn regex_dialect_matches() {
        let c = compile(Dialect::Regex, r"^/etc/.*").unwrap();
        assert!(matches_str(&c, "/etc/passwd").unwrap());
        assert!(!matches_str(&c, "/home/passwd").unwrap());
    }

    #[test]
    fn glob_dialect_matches() {
        let c = compile(Dialect::Glob, "/etc/**").unwrap();
        assert!(matches_str(&c, "/etc/ssh/sshd_config").unwrap());
    }

    #[test]
    fn rejects_oversized_input() {
        let c = compile(Dialect::String, "x").unwrap();
        let huge = "x".repeat(MAX_MATCH_INPUT_LEN + 1);
        assert!(matches_str(&c, &huge).is_err());
    }

    #[test]
    fn unknown_dialect_name_errors() {
        assert!(Dialect::parse("xpath").is_err());
    }
}
