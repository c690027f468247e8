//! Parses and validates a rules file, generalizing
//! `policy::Engine::load_from_yaml_path`'s "parse, validate every entry,
//! commit only on full success" discipline.

use serde::Deserialize;
use std::io::Read;
use superego_core::rule::{Conditions, RuleAction, RuleSet, SecurityRule};

const VALID_DIALECTS: &[&str] = &["string", "regex", "glob", "jsonpath"];

/// Schema of a rules file on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesFile {
    /// Declarative rule list.
    pub rules: Vec<RuleDef>,
}

/// One rule as it appears in the YAML schema, before priority clamping and
/// sort-order assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    /// Stable identifier, unique within the file.
    pub id: String,
    /// Human-readable justification for the rule's verdict.
    #[serde(default)]
    pub reason: Option<String>,
    /// Precedence; lower wins.
    #[serde(default)]
    pub priority: u16,
    /// Match conditions: named predicates plus `all_of`/`any_of`/`not`.
    pub conditions: Conditions,
    /// Action to take.
    pub action: RuleAction,
    /// Optional pinned provider name for `sample` rules.
    #[serde(default)]
    pub provider: Option<String>,
    /// Free-form guidance prepended to the inference prompt for `sample`
    /// rules.
    #[serde(default)]
    pub sampling_guidance: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Parse and fully validate a rules file, rejecting the whole document on
/// the first error rather than loading a partially valid rule set.
pub fn parse_and_validate(reader: impl Read) -> Result<RuleSet, String> {
    let file: RulesFile =
        serde_yaml::from_reader(reader).map_err(|e| format!("malformed rules YAML: {e}"))?;

    let mut seen_ids = std::collections::HashSet::new();
    let mut rules = Vec::with_capacity(file.rules.len());
    for (i, def) in file.rules.into_iter().enumerate() {
        if def.id.trim().is_empty() {
            return Err(format!("rules[{i}].id must be non-empty"));
        }
        if !seen_ids.insert(def.id.clone()) {
            return Err(format!("rules[{i}].id '{}' is a duplicate", def.id));
        }
        if def.conditions.is_empty() {
            return Err(format!("rules[{i}] ('{}') must declare at least one condition", def.id));
        }
        validate_conditions(&def.conditions, &format!("rules[{i}] ('{}')", def.id))?;
        if def.action != RuleAction::Sample && def.provider.is_some() {
            return Err(format!(
                "rules[{i}] ('{}') sets `provider` but action is not `sample`",
                def.id
            ));
        }
        if def.action != RuleAction::Sample && def.sampling_guidance.is_some() {
            return Err(format!(
                "rules[{i}] ('{}') sets `sampling_guidance` but action is not `sample`",
                def.id
            ));
        }

        rules.push(SecurityRule {
            id: def.id,
            reason: def.reason,
            priority: def.priority,
            conditions: def.conditions,
            action: def.action,
            provider: def.provider,
            sampling_guidance: def.sampling_guidance,
            tags: def.tags,
        });
    }

    Ok(RuleSet::new(rules))
}

/// Recursively validate every leaf dialect/pattern and nested combinator in
/// `conditions`, rejecting the whole rule on the first error.
fn validate_conditions(conditions: &Conditions, context: &str) -> Result<(), String> {
    for (field, leaf) in [
        ("tool_name", &conditions.tool_name),
        ("parameters", &conditions.parameters),
        ("cwd", &conditions.cwd),
        ("session_id", &conditions.session_id),
        ("agent_id", &conditions.agent_id),
    ] {
        if let Some(leaf) = leaf {
            validate_leaf(leaf.dialect(), leaf.value(), &format!("{context}.{field}"))?;
            if let Some(nested) = leaf.nested_match() {
                if leaf.dialect() != "jsonpath" {
                    return Err(format!(
                        "{context}.{field} sets `match` but its own type is not `jsonpath`"
                    ));
                }
                validate_leaf(&nested.dialect, &nested.value, &format!("{context}.{field}.match"))?;
            }
        }
    }
    for (i, nested) in conditions.all_of.iter().enumerate() {
        validate_conditions(nested, &format!("{context}.all_of[{i}]"))?;
    }
    for (i, nested) in conditions.any_of.iter().enumerate() {
        validate_conditions(nested, &format!("{context}.any_of[{i}]"))?;
    }
    if let Some(nested) = &conditions.not {
        validate_conditions(nested, &format!("{context}.not"))?;
    }
    Ok(())
}

fn validate_leaf(dialect: &str, pattern: &str, context: &str) -> Result<(), String> {
    if !VALID_DIALECTS.contains(&dialect) {
        return Err(format!("{context} has unknown dialect '{dialect}'; valid: {VALID_DIALECTS:?}"));
    }
    if dialect == "regex" {
        regex::Regex::new(pattern).map_err(|e| format!("{context} invalid regex: {e}"))?;
    }
    if dialect == "glob" {
        glob::Pattern::new(pattern).map_err(|e| format!("{context} invalid glob: {e}"))?;
    }
    Ok(())
}
