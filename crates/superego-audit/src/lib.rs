//! An in-memory, TTL-evicting audit log of policy decisions.
//!
//! A bounded in-memory ring: the gateway's audit trail is queried live by
//! operators and transports, not replayed from disk, so a capped
//! `VecDeque` behind a single lock is enough — no file handle needed.
//! Every entry is redacted before it is ever pushed onto the ring, so no
//! sensitive value is reachable even transiently.

use std::collections::VecDeque;
use std::sync::Mutex;

use superego_core::{AuditEntry, Decision, ParamValue, ToolRequest};
use superego_sanitize::Redactor;

/// Default number of entries retained before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default time-to-live for an entry, in seconds (24 hours).
pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// An extension point for shipping audit entries somewhere other than the
/// in-memory ring (a file, a remote sink, a message bus). The in-memory
/// [`AuditLog`] itself satisfies this trait so callers can depend on the
/// trait object alone.
pub trait AuditSink: Send + Sync {
    /// Record one entry. Sinks must not block the caller on anything
    /// slower than an in-process append; a sink fronting a slow backend
    /// should buffer and flush asynchronously rather than implement this
    /// as a blocking network call.
    fn record(&self, entry: AuditEntry);
}

/// A bounded, TTL-evicting, redaction-on-write audit log.
///
/// Concurrency: a single `Mutex<VecDeque<_>>` guards the ring. Appends and
/// reads are O(1) amortized and the critical section is never held across
/// an await point, so contention is limited to memcpy-sized critical
/// sections even under heavy evaluation load.
pub struct AuditLog {
    capacity: usize,
    ttl_seconds: i64,
    redactor: Redactor,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL_SECONDS, Redactor::default())
    }
}

impl AuditLog {
    /// Build a log with explicit capacity, TTL, and key-redaction policy.
    #[must_use]
    pub fn new(capacity: usize, ttl_seconds: i64, redactor: Redactor) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl_seconds,
            redactor,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Redact `request`'s parameters, build an [`AuditEntry`], and append
    /// it to the ring, evicting the oldest entry if at capacity.
    pub fn append(&self, request: ToolRequest, decision: Decision, matched_rule_ids: Vec<String>) {
        let redacted = self.redactor.redact_param_tree(&ParamValue::Object(request.parameters().clone()));
        let redacted_params = match redacted {
            ParamValue::Object(map) => map,
            _ => unreachable!("redacting an Object always yields an Object"),
        };
        let redacted_request = request.with_parameters(redacted_params);
        let entry = AuditEntry::new(redacted_request, decision, matched_rule_ids, self.ttl_seconds);

        tracing::debug!(entry_id = %entry.id, "audit entry recorded");

        let mut guard = self.entries.lock().expect("audit log lock poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    /// Return up to `limit` most recent entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let guard = self.entries.lock().expect("audit log lock poisoned");
        guard.iter().rev().take(limit).cloned().collect()
    }

    /// Number of entries currently retained (including any past their TTL
    /// but not yet purged).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log lock poisoned").len()
    }

    /// Whether the log currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose TTL has expired as of `at`, returning how
    /// many were purged. Intended to be called periodically by a
    /// background task, not on every `append`.
    pub fn purge_expired(&self, at: chrono::DateTime<chrono::Utc>) -> usize {
        let mut guard = self.entries.lock().expect("audit log lock poisoned");
        let before = guard.len();
        guard.retain(|e| !e.is_expired_at(at));
        before - guard.len()
    }
}

impl AuditSink for AuditLog {
    fn record(&self, entry: AuditEntry) {
        let mut guard = self.entries.lock().expect("audit log lock poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }
}
