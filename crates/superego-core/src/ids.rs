//! Id and timestamp helpers shared across the workspace.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new monotonic identifier (starts at 1), unique within the process.
pub fn next_monotonic_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Current UTC time.
#[must_use]
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

/// A fresh opaque UUID (v4), rendered as a string.
#[must_use]
pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}
