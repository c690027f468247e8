//! Error taxonomy shared across the Superego workspace.

use serde::Serialize;

/// Stable error classification used for propagation-policy decisions
/// (fail-closed mapping, HTTP status selection, log routing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request failed structural or sanitization validation.
    InvalidInput,
    /// A rule's condition evaluation raised an unexpected failure.
    RuleEvaluationFailed,
    /// A pattern failed to compile (malformed regex/glob/jsonpath).
    PatternCompilation,
    /// No inference provider could service a `sample` rule.
    InferenceUnavailable,
    /// An inference provider exceeded its allotted timeout.
    InferenceTimeout,
    /// The circuit breaker guarding a dependency is open.
    CircuitOpen,
    /// Configuration failed schema validation.
    ConfigInvalid,
    /// An internal invariant was violated; not attributable to caller input.
    Internal,
}

impl ErrorKind {
    /// Generic, non-technical message safe to show to an end user or agent.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid request",
            Self::RuleEvaluationFailed => "policy evaluation failed",
            Self::PatternCompilation => "policy configuration error",
            Self::InferenceUnavailable | Self::InferenceTimeout | Self::CircuitOpen => {
                "inference unavailable; denied for safety"
            }
            Self::ConfigInvalid => "configuration error",
            Self::Internal => "internal error",
        }
    }
}

/// The workspace-wide error type. Carries a classification plus an internal
/// (log-only) message; [`Error::user_message`] returns the safe, generic
/// string that is allowed to reach a transport response.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {internal}")]
pub struct Error {
    kind: ErrorKind,
    internal: String,
}

impl Error {
    /// Construct an error of the given kind with an internal (log-only) message.
    pub fn new(kind: ErrorKind, internal: impl Into<String>) -> Self {
        Self { kind, internal: internal.into() }
    }

    /// Shorthand for [`ErrorKind::InvalidInput`].
    pub fn invalid_input(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, internal)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, internal)
    }

    /// The error's stable classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The safe-for-display message; never echoes `internal`.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_never_echoes_internal() {
        let e = Error::invalid_input("tool_name 'rm -rf /' contains shell metacharacters");
        assert_eq!(e.user_message(), "invalid request");
        assert!(!e.user_message().contains("rm -rf"));
    }

    #[test]
    fn fail_closed_kinds_share_message() {
        let unavailable = Error::new(ErrorKind::InferenceUnavailable, "x");
        let timeout = Error::new(ErrorKind::InferenceTimeout, "y");
        let open = Error::new(ErrorKind::CircuitOpen, "z");
        assert_eq!(unavailable.user_message(), timeout.user_message());
        assert_eq!(timeout.user_message(), open.user_message());
    }
}
