//! The `AuditEntry` record: one sanitized, redacted snapshot of a decision
//! for replay/inspection by `superego-audit`.

use crate::decision::Decision;
use crate::ids::{new_uuid, now};
use crate::request::ToolRequest;
use serde::{Deserialize, Serialize};

/// One entry in the in-memory audit log.
///
/// `request` is expected to already be redacted (sensitive-key stripping
/// happens in `superego-sanitize` before the entry is built) — this type
/// does not redact on its own behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id.
    pub id: String,
    /// When the entry was recorded.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// The (redacted) request that was evaluated.
    pub request: ToolRequest,
    /// The decision reached.
    pub decision: Decision,
    /// Ids of every rule that matched, in evaluation order, not only the
    /// one that ultimately decided the outcome.
    pub matched_rule_ids: Vec<String>,
    /// When this entry becomes eligible for eviction.
    pub ttl_deadline: chrono::DateTime<chrono::Utc>,
}

impl AuditEntry {
    /// Build a new entry with a fresh id and current timestamp, with
    /// `ttl_deadline` set `ttl_seconds` in the future.
    #[must_use]
    pub fn new(
        request: ToolRequest,
        decision: Decision,
        matched_rule_ids: Vec<String>,
        ttl_seconds: i64,
    ) -> Self {
        let timestamp = now();
        Self {
            id: new_uuid(),
            timestamp,
            request,
            decision,
            matched_rule_ids,
            ttl_deadline: timestamp + chrono::Duration::seconds(ttl_seconds),
        }
    }

    /// Whether this entry's TTL has expired as of `at`.
    #[must_use]
    pub fn is_expired_at(&self, at: chrono::DateTime<chrono::Utc>) -> bool {
        at >= self.ttl_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use serde_json::json;

    #[test]
    fn expires_after_ttl() {
        let req = ToolRequest::new("echo", json!({}), "/tmp", "s", "a").unwrap();
        let entry = AuditEntry::new(req, Decision::fail_closed("x", 1), vec![], 60);
        assert!(!entry.is_expired_at(entry.timestamp));
        assert!(entry.is_expired_at(entry.timestamp + chrono::Duration::seconds(61)));
    }
}
