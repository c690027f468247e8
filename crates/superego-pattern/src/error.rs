//! Error type for pattern compilation and matching failures.

use thiserror::Error;

/// Errors raised while compiling or evaluating a pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern text failed to compile for its declared dialect.
    #[error("failed to compile {dialect} pattern '{pattern}': {source}")]
    Compile { dialect: String, pattern: String, source: String },
    /// The condition named a dialect this crate does not recognize.
    #[error("unknown pattern dialect '{0}'")]
    UnknownDialect(String),
    /// The input value exceeded the matcher's length bound and was rejected
    /// rather than matched against, to bound worst-case evaluation cost.
    #[error("input exceeds maximum length of {max} bytes")]
    InputTooLarge { max: usize },
}

impl From<PatternError> for superego_core::Error {
    fn from(e: PatternError) -> Self {
        match &e {
            PatternError::Compile { .. } | PatternError::UnknownDialect(_) => {
                superego_core::Error::new(superego_core::ErrorKind::PatternCompilation, e.to_string())
            }
            PatternError::InputTooLarge { .. } => {
                superego_core::Error::new(superego_core::ErrorKind::InvalidInput, e.to_string())
            }
        }
    }
}
