//! The lint engine.
//!
//! [`run`] walks the merged token/comment/line stream once, dispatching each
//! element to the enabled rules of the matching category. Problems are not
//! reported immediately: they accumulate in a per-line cache and are flushed
//! in position order when the line element arrives, after any `disable-line`
//! directive on that line has been seen. Directive state is carried by three
//! [`directives::DirectiveTracker`]s, and the single syntax error a file can
//! surface is spliced into the output at its position.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::LintConfig;
use crate::decoder::Decoder;
use crate::error::Result;
use crate::parser::{self, cst, reconstruct, Element};
use crate::rules::RuleCategory;

pub mod directives;

use directives::{DirectiveScope, DirectiveTracker};

static RE_DISABLE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[#\s]*yamllint disable-file\s*$").unwrap());

/// Problem severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Warning,
    Error,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Level::Warning),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// One problem found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintProblem {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Human-readable description, without the rule id.
    pub desc: String,
    /// Id of the rule that found it; `None` for syntax errors.
    pub rule: Option<&'static str>,
    pub level: Option<Level>,
}

impl LintProblem {
    pub fn new(line: usize, column: usize, desc: String) -> Self {
        Self {
            line,
            column,
            desc,
            rule: None,
            level: None,
        }
    }

    /// The description, with the rule id appended when there is one.
    pub fn message(&self) -> String {
        match self.rule {
            Some(rule) => format!("{} ({})", self.desc, rule),
            None => self.desc.clone(),
        }
    }
}

/// Lint a buffer, returning all problems in document order.
pub fn run(buffer: &str, conf: &LintConfig, filepath: Option<&Path>) -> Vec<LintProblem> {
    if let Some(path) = filepath {
        if conf.is_file_ignored(path) {
            debug!(path = %path.display(), "file is ignored by configuration");
            return Vec::new();
        }
    }

    let first_line = buffer.split('\n').next().unwrap_or("").trim_end_matches('\r');
    if RE_DISABLE_FILE.is_match(first_line) {
        return Vec::new();
    }

    let tree = cst::parse(buffer);
    let mut syntax = tree.as_ref().and_then(cst::syntax_error);
    let tokens = reconstruct::token_stream(buffer, tree.as_ref());
    let comments = parser::comments(buffer, &tokens);
    debug!(
        tokens = tokens.len(),
        comments = comments.len(),
        "reconstructed streams"
    );

    let active = conf.rules_for(filepath);
    let mut contexts: HashMap<&'static str, Box<dyn Any + Send>> = active
        .iter()
        .map(|ar| {
            let ctx = ar
                .rule
                .new_context()
                .unwrap_or_else(|| Box::new(()) as Box<dyn Any + Send>);
            (ar.rule.id(), ctx)
        })
        .collect();

    let rule_ids: Vec<String> = active.iter().map(|ar| ar.rule.id().to_string()).collect();
    let mut disabled = DirectiveTracker::new(DirectiveScope::Stream, rule_ids.clone());
    let mut disabled_for_line = DirectiveTracker::new(DirectiveScope::Line, rule_ids.clone());
    let mut disabled_for_next_line = DirectiveTracker::new(DirectiveScope::Line, rule_ids);

    let mut cache: Vec<LintProblem> = Vec::new();
    let mut problems: Vec<LintProblem> = Vec::new();

    for element in parser::elements(buffer, &tokens, &comments) {
        match element {
            Element::Token(view) => {
                for ar in &active {
                    if ar.rule.category() != RuleCategory::Token {
                        continue;
                    }
                    let ctx = contexts
                        .get_mut(ar.rule.id())
                        .expect("context created for every active rule");
                    for mut p in ar.rule.check_token(ar.options, buffer, &view, ctx.as_mut()) {
                        p.rule = Some(ar.rule.id());
                        p.level = Some(ar.level);
                        cache.push(p);
                    }
                }
            }
            Element::Comment(i) => {
                let comment = &comments[i];
                for ar in &active {
                    if ar.rule.category() != RuleCategory::Comment {
                        continue;
                    }
                    for mut p in ar.rule.check_comment(ar.options, buffer, comment, &tokens) {
                        p.rule = Some(ar.rule.id());
                        p.level = Some(ar.level);
                        cache.push(p);
                    }
                }
                let text = comment.text(buffer);
                disabled.process_comment(text);
                if comment.inline {
                    disabled_for_line.process_comment(text);
                } else {
                    disabled_for_next_line.process_comment(text);
                }
            }
            Element::Line(line) => {
                for ar in &active {
                    if ar.rule.category() != RuleCategory::Line {
                        continue;
                    }
                    for mut p in ar.rule.check_line(ar.options, &line) {
                        p.rule = Some(ar.rule.id());
                        p.level = Some(ar.level);
                        cache.push(p);
                    }
                }

                // Flush: everything found on this line, in position order.
                cache.sort_by_key(|p| (p.line, p.column));
                for p in cache.drain(..) {
                    let splice = syntax
                        .as_ref()
                        .map_or(false, |se| (se.line, se.column) <= (p.line, p.column));
                    if splice {
                        let se = syntax.take().expect("checked above");
                        // A cosmetic problem at the syntax error's exact
                        // position is redundant noise.
                        let superseded = se.line == p.line && se.column == p.column;
                        problems.push(se);
                        if superseded {
                            continue;
                        }
                    }
                    if disabled.is_disabled(&p) || disabled_for_line.is_disabled(&p) {
                        continue;
                    }
                    problems.push(p);
                }

                let fresh = disabled_for_next_line.fresh();
                disabled_for_line = std::mem::replace(&mut disabled_for_next_line, fresh);
            }
        }
    }

    if let Some(se) = syntax.take() {
        problems.push(se);
    }

    problems
}

/// Decode raw bytes and lint them.
pub fn run_bytes(
    input: &[u8],
    decoder: &dyn Decoder,
    conf: &LintConfig,
    filepath: Option<&Path>,
) -> Result<Vec<LintProblem>> {
    let buffer = decoder.decode(input)?;
    Ok(run(&buffer, conf, filepath))
}
