//! yamllint - A linter for YAML files.
//!
//! Lints YAML documents against configurable style and correctness rules,
//! reporting problems with exact line/column positions. Unlike a plain YAML
//! parser, the linter works on a reconstructed lexical token stream, so it
//! can see cosmetic details (indentation, comments, trailing whitespace)
//! that document trees erase.
//!
//! # Modules
//!
//! - [`config`] - Configuration parsing and validation
//! - [`decoder`] - Raw byte input decoding
//! - [`error`] - Error types and result alias
//! - [`linter`] - The lint engine and problem model
//! - [`parser`] - Token, comment and line stream reconstruction
//! - [`rules`] - Built-in rules and the rule registry
//!
//! # Example
//!
//! ```
//! use yamllint::config::LintConfig;
//! use yamllint::rules::RuleRegistry;
//!
//! let conf = LintConfig::with_all_defaults(RuleRegistry::with_builtins());
//! let problems = yamllint::linter::run("key: value  \n", &conf, None);
//! assert_eq!(problems.len(), 1);
//! assert_eq!(problems[0].message(), "trailing spaces (trailing-spaces)");
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod linter;
pub mod parser;
pub mod rules;

pub use error::{Result, YamllintError};
pub use linter::{Level, LintProblem};
