//! Controls comment formatting.
//!
//! Checks that comments start with `# ` (shebang lines exempt by default)
//! and that inline comments keep a minimum distance from the content they
//! follow.

use crate::linter::LintProblem;
use crate::parser::{Comment, Token};
use crate::rules::{OptionKind, OptionSpec, OptionValue, Rule, RuleCategory, RuleOptions};

pub struct Comments;

static OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "require-starting-space",
        OptionKind::Bool,
        OptionValue::Bool(true),
    ),
    OptionSpec::new("ignore-shebangs", OptionKind::Bool, OptionValue::Bool(true)),
    OptionSpec::new(
        "min-spaces-from-content",
        OptionKind::Int,
        OptionValue::Int(2),
    ),
];

impl Rule for Comments {
    fn id(&self) -> &'static str {
        "comments"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Comment
    }

    fn options(&self) -> &'static [OptionSpec] {
        OPTIONS
    }

    fn check_comment(
        &self,
        opts: &RuleOptions,
        buffer: &str,
        comment: &Comment,
        tokens: &[Token],
    ) -> Vec<LintProblem> {
        let mut problems = Vec::new();
        let text = comment.text(buffer);

        let min_spaces = opts.int("min-spaces-from-content").unwrap_or(2);
        if min_spaces >= 1 && comment.inline {
            if let Some(before) = comment.token_before.and_then(|i| tokens.get(i)) {
                let gap = comment.pointer.saturating_sub(before.end_mark.index);
                if (gap as i64) < min_spaces {
                    problems.push(LintProblem::new(
                        comment.line_no,
                        comment.column_no,
                        "too few spaces before comment".to_string(),
                    ));
                }
            }
        }

        if opts.bool("require-starting-space") {
            let body = text.trim_start_matches('#');
            let hashes = text.len() - body.len();
            let shebang_exempt = opts.bool("ignore-shebangs")
                && comment.line_no == 1
                && comment.column_no == 1
                && body.starts_with('!');
            if !body.is_empty() && !body.starts_with(' ') && !shebang_exempt {
                problems.push(LintProblem::new(
                    comment.line_no,
                    comment.column_no + hashes,
                    "missing starting space in comment".to_string(),
                ));
            }
        }

        problems
    }
}
