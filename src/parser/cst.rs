//! Concrete-syntax-tree parsing via tree-sitter.
//!
//! The external parser produces a CST whose nodes carry a kind tag, byte
//! offsets and literal source slices. The reconstructor flattens that tree
//! into the token stream; this module only owns the parser setup and the
//! one-shot syntax-error probe.

use tree_sitter::{Node, Parser, Tree};

use crate::linter::{Level, LintProblem};

/// Parse a YAML document into its concrete syntax tree.
///
/// tree-sitter is error-tolerant: this always yields a tree, possibly
/// containing ERROR/MISSING nodes. Returns `None` only if the parser itself
/// could not run, in which case the caller degrades to an empty stream.
pub fn parse(buffer: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_yaml::LANGUAGE.into();
    parser.set_language(&language).ok()?;
    parser.parse(buffer, None)
}

/// Probe a parsed tree for the first syntax error.
///
/// At most one syntax error is surfaced per run. The probe reports the
/// position of the first ERROR or MISSING node in document order, falling
/// back to (1, 1) when the tree is marked erroneous without a locatable
/// node.
pub fn syntax_error(tree: &Tree) -> Option<LintProblem> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let (line, column, detail) = match first_error_node(root) {
        Some(node) if node.is_missing() => (
            node.start_position().row + 1,
            node.start_position().column + 1,
            format!("expected {}", display_kind(node.kind())),
        ),
        Some(node) => (
            node.start_position().row + 1,
            node.start_position().column + 1,
            "could not find expected token".to_string(),
        ),
        None => (1, 1, "could not find expected token".to_string()),
    };

    let mut problem = LintProblem::new(line, column, format!("syntax error: {detail} (syntax)"));
    problem.level = Some(Level::Error);
    Some(problem)
}

fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    // Iterative depth-first search; recursion depth would otherwise be
    // bounded by document nesting.
    let mut stack = vec![root];
    let mut best: Option<Node<'_>> = None;
    while let Some(node) = stack.pop() {
        if !node.has_error() {
            continue;
        }
        if node.is_error() || node.is_missing() {
            best = match best {
                Some(b) if b.start_byte() <= node.start_byte() => Some(b),
                _ => Some(node),
            };
            continue;
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    best
}

fn display_kind(kind: &str) -> String {
    match kind {
        "\"" | "'" => "closing quote".to_string(),
        "]" => "']'".to_string(),
        "}" => "'}'".to_string(),
        other => other.replace('_', " "),
    }
}
