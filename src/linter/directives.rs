//! `# yamllint disable` comment directives.
//!
//! Three trackers run side by side during a lint pass:
//!
//! - one for `disable`/`enable`, scoped from the directive to the matching
//!   `enable` (or end of file);
//! - two for `disable-line`, because an inline directive applies to its own
//!   line while a full-line directive applies to the *next* line. The engine
//!   rotates the "next line" tracker into the "current line" slot at each
//!   line flush.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::linter::LintProblem;

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

lazy_regex!(RE_DISABLE, r"^#[#\s]*yamllint disable((?: rule:\S+)*)\s*$");
lazy_regex!(RE_ENABLE, r"^#[#\s]*yamllint enable((?: rule:\S+)*)\s*$");
lazy_regex!(
    RE_DISABLE_LINE,
    r"^#[#\s]*yamllint disable-line((?: rule:\S+)*)\s*$"
);

/// Whether the directive applies from here on or to a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveScope {
    /// `disable` / `enable` pairs.
    Stream,
    /// `disable-line`.
    Line,
}

/// Tracks which rules are currently disabled by comment directives.
#[derive(Debug, Clone)]
pub struct DirectiveTracker {
    scope: DirectiveScope,
    all_rules: BTreeSet<String>,
    rules: BTreeSet<String>,
}

impl DirectiveTracker {
    pub fn new(scope: DirectiveScope, all_rules: impl IntoIterator<Item = String>) -> Self {
        Self {
            scope,
            all_rules: all_rules.into_iter().collect(),
            rules: BTreeSet::new(),
        }
    }

    /// A fresh tracker with the same scope and rule universe but no active
    /// disables.
    pub fn fresh(&self) -> Self {
        Self {
            scope: self.scope,
            all_rules: self.all_rules.clone(),
            rules: BTreeSet::new(),
        }
    }

    /// Feed one comment's text to the tracker.
    ///
    /// Unknown rule ids in a directive are ignored, matching the behavior of
    /// a directive naming a rule the configuration never enabled.
    pub fn process_comment(&mut self, comment: &str) {
        match self.scope {
            DirectiveScope::Stream => {
                if let Some(caps) = RE_DISABLE.captures(comment) {
                    self.disable(&caps[1]);
                } else if let Some(caps) = RE_ENABLE.captures(comment) {
                    self.enable(&caps[1]);
                }
            }
            DirectiveScope::Line => {
                if let Some(caps) = RE_DISABLE_LINE.captures(comment) {
                    self.disable(&caps[1]);
                }
            }
        }
    }

    /// Whether `problem` is suppressed by the currently active directives.
    pub fn is_disabled(&self, problem: &LintProblem) -> bool {
        match problem.rule {
            Some(id) => self.rules.contains(id),
            None => false,
        }
    }

    fn disable(&mut self, args: &str) {
        if args.is_empty() {
            self.rules = self.all_rules.clone();
        } else {
            for id in args.split(" rule:").filter(|s| !s.is_empty()) {
                if self.all_rules.contains(id) {
                    self.rules.insert(id.to_string());
                }
            }
        }
    }

    fn enable(&mut self, args: &str) {
        if args.is_empty() {
            self.rules.clear();
        } else {
            for id in args.split(" rule:").filter(|s| !s.is_empty()) {
                self.rules.remove(id);
            }
        }
    }
}
