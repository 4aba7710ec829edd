//! Lint rules and their registry.
//!
//! Rules are small, stateful-per-file checkers. Each one belongs to exactly
//! one category deciding which elements of the merged stream it sees:
//! token rules get each token with one-behind/two-ahead context, comment
//! rules get each comment, line rules get each physical line.
//!
//! The registry holds the rule set as trait objects keyed by id. It is an
//! explicit value, not a global: configurations reference rules by id and
//! resolve them against the registry they were built with.

use std::any::Any;
use std::collections::BTreeMap;

use crate::linter::LintProblem;
use crate::parser::{Comment, Line, Token, TokenView};

pub mod comments;
pub mod indentation;
pub mod key_duplicates;
pub mod options;
pub mod trailing_spaces;

pub use options::{OptionKind, OptionSpec, OptionValue, RuleOptions};

/// Which elements of the merged stream a rule consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Token,
    Comment,
    Line,
}

/// A lint rule.
///
/// The default method bodies make each category's unused hooks no-ops, so a
/// rule only implements the one matching its category. Per-file state lives
/// in an opaque context created by [`Rule::new_context`] and threaded back
/// into every [`Rule::check_token`] call.
pub trait Rule: Send + Sync {
    /// Stable rule identifier, e.g. `"indentation"`.
    fn id(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// The options this rule accepts.
    fn options(&self) -> &'static [OptionSpec] {
        &[]
    }

    /// Fresh per-file state. `None` for stateless rules.
    fn new_context(&self) -> Option<Box<dyn Any + Send>> {
        None
    }

    fn check_token(
        &self,
        _opts: &RuleOptions,
        _buffer: &str,
        _token: &TokenView<'_>,
        _context: &mut (dyn Any + Send),
    ) -> Vec<LintProblem> {
        Vec::new()
    }

    fn check_comment(
        &self,
        _opts: &RuleOptions,
        _buffer: &str,
        _comment: &Comment,
        _tokens: &[Token],
    ) -> Vec<LintProblem> {
        Vec::new()
    }

    fn check_line(&self, _opts: &RuleOptions, _line: &Line<'_>) -> Vec<LintProblem> {
        Vec::new()
    }
}

/// Registry of all known rules, keyed by id.
pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Box<dyn Rule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in rule.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(comments::Comments));
        registry.register(Box::new(indentation::Indentation));
        registry.register(Box::new(key_duplicates::KeyDuplicates));
        registry.register(Box::new(trailing_spaces::TrailingSpaces));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.insert(rule.id(), rule);
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.get(id).map(Box::as_ref)
    }

    /// Rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.values().map(Box::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
