//! Error types for yamllint operations.
//!
//! This module defines [`YamllintError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems (unknown rules, bad option values, conflicting
//!   ignore settings) are rejected here, at configuration construction time.
//! - A lint run itself never fails: a document that cannot be parsed is
//!   reported as a syntax-error [`LintProblem`](crate::linter::LintProblem),
//!   not as a `YamllintError`.
//! - Use `anyhow::Error` (via `YamllintError::Other`) for unexpected errors.

use thiserror::Error;

/// Core error type for yamllint operations.
#[derive(Debug, Error)]
pub enum YamllintError {
    /// Configuration document could not be parsed as YAML.
    #[error("invalid config: {message}")]
    ConfigParse { message: String },

    /// Configuration references a rule id that is not in the registry.
    #[error("invalid config: no such rule: \"{id}\"")]
    UnknownRule { id: String },

    /// Configuration sets an option the rule does not declare.
    #[error("invalid config: unknown option \"{option}\" for rule \"{rule}\"")]
    UnknownOption { rule: String, option: String },

    /// Configuration sets an option to a value outside its declared schema.
    #[error("invalid config: option \"{option}\" of \"{rule}\" should be {expected}")]
    InvalidOptionValue {
        rule: String,
        option: String,
        expected: String,
    },

    /// An ignore pattern failed to compile.
    #[error("invalid config: bad ignore pattern \"{pattern}\": {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    /// `ignore` and `ignore-from-file` cannot be combined.
    #[error("invalid config: ignore and ignore-from-file keys cannot be used together")]
    ConflictingIgnore,

    /// Input bytes could not be decoded to text.
    #[error("invalid input: {message}")]
    Decode { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for yamllint operations.
pub type Result<T> = std::result::Result<T, YamllintError>;
