//! Forbids trailing spaces and tabs at the end of lines.

use crate::linter::LintProblem;
use crate::parser::Line;
use crate::rules::{Rule, RuleCategory, RuleOptions};

pub struct TrailingSpaces;

impl Rule for TrailingSpaces {
    fn id(&self) -> &'static str {
        "trailing-spaces"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Line
    }

    fn check_line(&self, _opts: &RuleOptions, line: &Line<'_>) -> Vec<LintProblem> {
        let content = line.content();
        let trimmed = content.trim_end_matches([' ', '\t']);
        if trimmed.len() == content.len() {
            return Vec::new();
        }
        vec![LintProblem::new(
            line.line_no,
            trimmed.len() + 1,
            "trailing spaces".to_string(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines;

    fn check(buffer: &str) -> Vec<LintProblem> {
        let opts = RuleOptions::default();
        lines(buffer)
            .iter()
            .flat_map(|line| TrailingSpaces.check_line(&opts, line))
            .collect()
    }

    #[test]
    fn clean_lines_pass() {
        assert!(check("key: value\nother: x\n").is_empty());
    }

    #[test]
    fn reports_column_after_content() {
        let problems = check("key: value  \n");
        assert_eq!(problems.len(), 1);
        assert_eq!((problems[0].line, problems[0].column), (1, 11));
        assert_eq!(problems[0].desc, "trailing spaces");
    }

    #[test]
    fn tabs_count_as_trailing_whitespace() {
        let problems = check("key: value\t\n");
        assert_eq!((problems[0].line, problems[0].column), (1, 11));
    }

    #[test]
    fn whitespace_only_line_is_reported_at_column_one() {
        let problems = check("key: value\n   \nother: x\n");
        assert_eq!(problems.len(), 1);
        assert_eq!((problems[0].line, problems[0].column), (2, 1));
    }

    #[test]
    fn final_line_without_newline_is_checked() {
        let problems = check("key: value ");
        assert_eq!((problems[0].line, problems[0].column), (1, 11));
    }
}
