//! Sensitive-key redaction and evaluation prompt rendering, built on top of
//! the baseline sanitization primitives in `superego_core::sanitize`.

pub mod prompt;
pub mod redact;

pub use prompt::PromptBuilder;
pub use redact::{Redactor, DEFAULT_SENSITIVE_KEY_PATTERNS, REDACTED_PLACEHOLDER};
