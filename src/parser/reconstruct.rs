//! CST→token reconstruction.
//!
//! Rebuilds a flat, PyYAML-style token stream from the concrete syntax tree:
//! every structural indicator and scalar becomes one positioned [`Token`],
//! and block scopes — which YAML delimits purely by indentation — get
//! synthetic [`TokenData::BlockEnd`] close markers reconstructed with the
//! off-side rule.
//!
//! The reconstruction never fails. Malformed input degrades to a best-effort
//! stream so cosmetic rules keep running; parse failures are reported
//! separately by the syntax probe in [`super::cst`].

use tree_sitter::{Node, Tree};

use super::token::{Mark, ScalarStyle, Token, TokenData, TokenKind};

/// A flattened token candidate, before ordering and block-end synthesis.
struct Descriptor {
    data: TokenData,
    start: Mark,
    end: Mark,
}

impl Descriptor {
    fn span(data: TokenData, node: &Node<'_>) -> Self {
        Self {
            data,
            start: mark_at(node.start_position(), node.start_byte()),
            end: mark_at(node.end_position(), node.end_byte()),
        }
    }

    fn zero_width(data: TokenData, node: &Node<'_>) -> Self {
        let mark = mark_at(node.start_position(), node.start_byte());
        Self {
            data,
            start: mark,
            end: mark,
        }
    }
}

fn mark_at(pos: tree_sitter::Point, index: usize) -> Mark {
    Mark::new(pos.row, pos.column, index)
}

/// Reconstruct the ordered token stream for `buffer`.
///
/// `StreamStart` comes first and `StreamEnd` last; block-container starts
/// and their synthetic `BlockEnd` counterparts are balanced for any
/// syntactically valid document.
pub fn token_stream(buffer: &str, tree: Option<&Tree>) -> Vec<Token> {
    let mut descriptors = match tree {
        Some(tree) => flatten(buffer, tree),
        None => Vec::new(),
    };

    // Offset order; at equal offsets a block-container start precedes any
    // sibling, and a Key precedes the key's scalar.
    descriptors.sort_by_key(|d| (d.start.index, priority(d.data.kind())));
    descriptors.dedup_by(|b, a| b.start.index == a.start.index && b.data.kind() == a.data.kind());

    synthesize_block_ends(buffer, descriptors)
}

fn priority(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::BlockMappingStart | TokenKind::BlockSequenceStart => 0,
        TokenKind::Key => 1,
        _ => 2,
    }
}

/// Depth-first flatten of the CST into token descriptors.
fn flatten(buffer: &str, tree: &Tree) -> Vec<Descriptor> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        let mut recurse = true;

        match node.kind() {
            "---" => out.push(Descriptor::span(TokenData::DocumentStart, &node)),
            "..." => out.push(Descriptor::span(TokenData::DocumentEnd, &node)),
            "-" => out.push(Descriptor::span(TokenData::BlockEntry, &node)),
            "?" => out.push(Descriptor::span(TokenData::Key, &node)),
            ":" => out.push(Descriptor::span(TokenData::Value, &node)),
            "," => out.push(Descriptor::span(TokenData::FlowEntry, &node)),
            "{" => out.push(Descriptor::span(TokenData::FlowMappingStart, &node)),
            "}" => out.push(Descriptor::span(TokenData::FlowMappingEnd, &node)),
            "[" => out.push(Descriptor::span(TokenData::FlowSequenceStart, &node)),
            "]" => out.push(Descriptor::span(TokenData::FlowSequenceEnd, &node)),
            "block_mapping" => {
                out.push(Descriptor::zero_width(TokenData::BlockMappingStart, &node));
            }
            "block_sequence" => {
                // PyYAML only emits a sequence start when the sequence is
                // more indented than its enclosing block scope. A
                // zero-indented sequence under a mapping key is "implicit":
                // it gets neither a start nor a matching BlockEnd.
                if sequence_start_visible(&node) {
                    out.push(Descriptor::zero_width(TokenData::BlockSequenceStart, &node));
                }
            }
            "block_mapping_pair" | "flow_pair" => {
                if !has_explicit_key(&node) {
                    if let Some(key) = node.child_by_field_name("key") {
                        out.push(Descriptor::zero_width(TokenData::Key, &key));
                    }
                }
            }
            "plain_scalar" => {
                out.push(Descriptor::span(
                    TokenData::Scalar {
                        value: text(buffer, &node).to_string(),
                        style: ScalarStyle::Plain,
                    },
                    &node,
                ));
                recurse = false;
            }
            "single_quote_scalar" => {
                out.push(Descriptor::span(
                    TokenData::Scalar {
                        value: unquote_single(text(buffer, &node)),
                        style: ScalarStyle::SingleQuoted,
                    },
                    &node,
                ));
                recurse = false;
            }
            "double_quote_scalar" => {
                out.push(Descriptor::span(
                    TokenData::Scalar {
                        value: unquote_double(text(buffer, &node)),
                        style: ScalarStyle::DoubleQuoted,
                    },
                    &node,
                ));
                recurse = false;
            }
            "block_scalar" => {
                // The literal span drives position math; the resolved
                // logical value (indentation stripped, lines folded) is the
                // token's reportable value.
                let (value, style) = resolve_block_scalar(text(buffer, &node));
                out.push(Descriptor::span(TokenData::Scalar { value, style }, &node));
                recurse = false;
            }
            "anchor" => {
                let value = text(buffer, &node).trim_start_matches('&').to_string();
                out.push(Descriptor::span(TokenData::Anchor { value }, &node));
                recurse = false;
            }
            "alias" => {
                let value = text(buffer, &node).trim_start_matches('*').to_string();
                out.push(Descriptor::span(TokenData::Alias { value }, &node));
                recurse = false;
            }
            "tag" => {
                out.push(Descriptor::span(
                    TokenData::Tag {
                        text: text(buffer, &node).to_string(),
                    },
                    &node,
                ));
                recurse = false;
            }
            "yaml_directive" | "tag_directive" | "reserved_directive" => {
                out.push(directive_descriptor(buffer, &node));
                recurse = false;
            }
            "comment" => recurse = false,
            // stream, document, block_node, flow_node, items, ERROR: walk
            // through; unknown kinds are ignored (best-effort on malformed
            // input).
            _ => {}
        }

        if recurse {
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
    }

    out
}

fn text<'a>(buffer: &'a str, node: &Node<'_>) -> &'a str {
    buffer.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// The `%` indicator sits outside the directive node; pull it into the span.
fn directive_descriptor(buffer: &str, node: &Node<'_>) -> Descriptor {
    let mut d = Descriptor::span(
        TokenData::Directive {
            text: text(buffer, node).to_string(),
        },
        node,
    );
    let start = d.start.index;
    if start > 0 && buffer.as_bytes()[start - 1] == b'%' && d.start.column > 0 {
        d.start.index -= 1;
        d.start.column -= 1;
        if let TokenData::Directive { text } = &mut d.data {
            text.insert(0, '%');
        }
    }
    d
}

fn has_explicit_key(node: &Node<'_>) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "?")
}

fn sequence_start_visible(node: &Node<'_>) -> bool {
    let column = node.start_position().column;
    let mut parent = node.parent();
    while let Some(p) = parent {
        match p.kind() {
            "block_mapping" | "block_sequence" => {
                return column > p.start_position().column;
            }
            _ => parent = p.parent(),
        }
    }
    true
}

/// Open block scopes tracked during block-end synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Mapping,
    Sequence,
    /// Explicit `? key` scope; closes silently, never emits a BlockEnd.
    ExplicitKey,
}

struct Scope {
    kind: ScopeKind,
    indent: usize,
}

/// Second pass: walk the ordered descriptors with a LIFO stack of open block
/// containers and emit a synthetic `BlockEnd` for every scope the off-side
/// rule closes.
fn synthesize_block_ends(buffer: &str, descriptors: Vec<Descriptor>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(descriptors.len() + 8);
    tokens.push(Token::at(TokenData::StreamStart, Mark::new(0, 0, 0)));

    let mut open: Vec<Scope> = Vec::new();
    let mut flow_depth = 0usize;
    let mut last_line: Option<usize> = None;

    for d in descriptors {
        let line_initial = last_line.map_or(true, |l| d.start.line > l);

        // Block scopes can only close at the start of a line, and never
        // while inside a flow collection.
        if flow_depth == 0 && line_initial {
            while let Some(top) = open.last() {
                let column = d.start.column;
                let kind = d.data.kind();
                let close = match top.kind {
                    ScopeKind::ExplicitKey => column <= top.indent,
                    ScopeKind::Mapping => {
                        top.indent > column
                            || (top.indent == column && !continues_mapping(kind))
                    }
                    ScopeKind::Sequence => {
                        top.indent > column
                            || (top.indent == column && kind != TokenKind::BlockEntry)
                    }
                };
                if !close {
                    break;
                }
                if let Some(scope) = open.pop() {
                    if scope.kind != ScopeKind::ExplicitKey {
                        tokens.push(Token::at(TokenData::BlockEnd, d.start));
                    }
                }
            }
        }
        last_line = Some(d.start.line);

        match d.data.kind() {
            TokenKind::BlockMappingStart if flow_depth == 0 => open.push(Scope {
                kind: ScopeKind::Mapping,
                indent: d.start.column,
            }),
            TokenKind::BlockSequenceStart if flow_depth == 0 => open.push(Scope {
                kind: ScopeKind::Sequence,
                indent: d.start.column,
            }),
            // An explicit `? key` opens its own scope so that content nested
            // under the key cannot close the owning mapping early.
            TokenKind::Key if flow_depth == 0 && d.start.index < d.end.index => {
                open.push(Scope {
                    kind: ScopeKind::ExplicitKey,
                    indent: d.start.column,
                })
            }
            TokenKind::FlowMappingStart | TokenKind::FlowSequenceStart => flow_depth += 1,
            TokenKind::FlowMappingEnd | TokenKind::FlowSequenceEnd => {
                flow_depth = flow_depth.saturating_sub(1)
            }
            _ => {}
        }

        tokens.push(Token::new(d.data, d.start, d.end));
    }

    let end = end_of_buffer(buffer);
    while let Some(scope) = open.pop() {
        if scope.kind != ScopeKind::ExplicitKey {
            tokens.push(Token::at(TokenData::BlockEnd, end));
        }
    }
    tokens.push(Token::at(TokenData::StreamEnd, end));
    tokens
}

/// Tokens that continue an open mapping at equal indent instead of closing
/// it: the next key, a value indicator, a scalar, or a zero-indented
/// sequence under one of the mapping's keys.
fn continues_mapping(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Key
            | TokenKind::Scalar
            | TokenKind::Value
            | TokenKind::BlockSequenceStart
            | TokenKind::BlockEntry
    )
}

fn end_of_buffer(buffer: &str) -> Mark {
    let line = buffer.bytes().filter(|&b| b == b'\n').count();
    let line_start = buffer.rfind('\n').map_or(0, |i| i + 1);
    Mark::new(line, buffer.len() - line_start, buffer.len())
}

fn unquote_single(text: &str) -> String {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text);
    inner.replace("''", "'")
}

fn unquote_double(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

/// Resolve a block scalar's logical value from its literal text.
///
/// The header line gives the style (`|`/`>`) and chomping; content
/// indentation is detected from the first non-empty line and stripped, and
/// folded scalars get single line breaks turned into spaces.
fn resolve_block_scalar(literal: &str) -> (String, ScalarStyle) {
    let mut lines = literal.split('\n');
    let header = lines.next().unwrap_or("");
    let style = if header.starts_with('>') {
        ScalarStyle::Folded
    } else {
        ScalarStyle::Literal
    };

    let mut chomp = Chomp::Clip;
    for c in header.chars().skip(1) {
        match c {
            '+' => chomp = Chomp::Keep,
            '-' => chomp = Chomp::Strip,
            // Explicit indent digits are accepted but the effective indent
            // is still detected from the content, since the header column
            // alone does not give the parent scope's indent.
            '1'..='9' => {}
            ' ' | '\t' | '#' => break,
            _ => {}
        }
    }

    let content: Vec<&str> = lines.collect();
    let indent = content
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .unwrap_or(0);

    let stripped: Vec<&str> = content
        .iter()
        .map(|l| {
            let leading = l.len() - l.trim_start_matches(' ').len();
            &l[indent.min(leading)..]
        })
        .collect();

    let mut value = match style {
        ScalarStyle::Folded => fold_lines(&stripped),
        _ => stripped.join("\n"),
    };

    match chomp {
        Chomp::Strip => {
            while value.ends_with('\n') {
                value.pop();
            }
        }
        Chomp::Clip => {
            while value.ends_with('\n') {
                value.pop();
            }
            if !value.is_empty() {
                value.push('\n');
            }
        }
        Chomp::Keep => {
            if !value.ends_with('\n') && !value.is_empty() {
                value.push('\n');
            }
        }
    }

    (value, style)
}

fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut pending_breaks = 0usize;
    let mut first = true;
    let mut prev_more_indented = false;

    for line in lines {
        if line.is_empty() {
            pending_breaks += 1;
            continue;
        }
        let more_indented = line.starts_with(' ') || line.starts_with('\t');
        if first {
            first = false;
        } else if more_indented || prev_more_indented {
            // Breaks adjacent to more-indented lines stay literal.
            out.push_str(&"\n".repeat(pending_breaks + 1));
        } else if pending_breaks == 0 {
            out.push(' ');
        } else {
            out.push_str(&"\n".repeat(pending_breaks));
        }
        out.push_str(line);
        prev_more_indented = more_indented;
        pending_breaks = 0;
    }

    out.push_str(&"\n".repeat(pending_breaks));
    out
}

#[cfg(test)]
mod tests {
    use super::super::cst;
    use super::*;

    fn kinds(buffer: &str) -> Vec<TokenKind> {
        let tree = cst::parse(buffer);
        token_stream(buffer, tree.as_ref())
            .iter()
            .map(Token::kind)
            .collect()
    }

    fn assert_balanced(buffer: &str) {
        use TokenKind::*;
        let mut depth = 0i64;
        for kind in kinds(buffer) {
            match kind {
                BlockMappingStart | BlockSequenceStart => depth += 1,
                BlockEnd => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0, "unmatched BlockEnd in {buffer:?}");
        }
        assert_eq!(depth, 0, "unbalanced block scopes in {buffer:?}");
    }

    #[test]
    fn stream_is_delimited() {
        let ks = kinds("key: value\n");
        assert_eq!(ks.first(), Some(&TokenKind::StreamStart));
        assert_eq!(ks.last(), Some(&TokenKind::StreamEnd));
    }

    #[test]
    fn simple_mapping_token_order() {
        use TokenKind::*;
        assert_eq!(
            kinds("key: value\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn nested_mapping_gets_two_block_ends() {
        use TokenKind::*;
        assert_eq!(
            kinds("object:\n  key: v\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn sibling_key_closes_nested_mapping_before_it() {
        use TokenKind::*;
        assert_eq!(
            kinds("a:\n  b: 1\nc: 2\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn indented_sequence_has_visible_start() {
        use TokenKind::*;
        assert_eq!(
            kinds("key:\n  - a\n  - b\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockSequenceStart,
                BlockEntry,
                Scalar,
                BlockEntry,
                Scalar,
                BlockEnd,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn zero_indented_sequence_is_implicit() {
        use TokenKind::*;
        // PyYAML parity: no BlockSequenceStart and no extra BlockEnd for a
        // sequence at the same indent as its mapping.
        assert_eq!(
            kinds("key:\n- a\n- b\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockEntry,
                Scalar,
                BlockEntry,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn top_level_sequence_has_visible_start() {
        use TokenKind::*;
        assert_eq!(
            kinds("- a\n- b\n"),
            vec![
                StreamStart,
                BlockSequenceStart,
                BlockEntry,
                Scalar,
                BlockEntry,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn sequence_of_mappings_closes_each_item() {
        use TokenKind::*;
        assert_eq!(
            kinds("- a: 1\n- b: 2\n"),
            vec![
                StreamStart,
                BlockSequenceStart,
                BlockEntry,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                BlockEntry,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn flow_collections_do_not_synthesize_block_ends() {
        use TokenKind::*;
        assert_eq!(
            kinds("key: {a: 1, b: 2}\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                FlowMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                FlowEntry,
                Key,
                Scalar,
                Value,
                Scalar,
                FlowMappingEnd,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn multi_line_flow_does_not_close_block_scopes() {
        assert_balanced("key: [\n  1,\n  2,\n]\nother: x\n");
    }

    #[test]
    fn document_markers_close_open_scopes() {
        use TokenKind::*;
        assert_eq!(
            kinds("---\na: 1\n---\nb: 2\n"),
            vec![
                StreamStart,
                DocumentStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                DocumentStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn stream_order_is_strictly_by_offset() {
        let buffer = "a:\n  - x\n  - y\nb:\n  c: 1\n";
        let tree = cst::parse(buffer);
        let tokens = token_stream(buffer, tree.as_ref());
        for pair in tokens.windows(2) {
            assert!(pair[0].start_mark.index <= pair[1].start_mark.index);
        }
        assert_balanced(buffer);
    }

    #[test]
    fn anchors_aliases_and_tags_are_tokens() {
        use TokenKind::*;
        let ks = kinds("base: &b !!str value\nother: *b\n");
        assert!(ks.contains(&Anchor));
        assert!(ks.contains(&Alias));
        assert!(ks.contains(&Tag));
    }

    #[test]
    fn anchored_key_does_not_close_its_mapping() {
        assert_balanced("a: 1\n&anchor b: 2\nc: 3\n");
    }

    #[test]
    fn explicit_keys_balance() {
        use TokenKind::*;
        let ks = kinds("? complex\n: value\n");
        assert_eq!(
            ks,
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn malformed_input_still_produces_a_stream() {
        let buffer = "key: [\n";
        let tree = cst::parse(buffer);
        let tokens = token_stream(buffer, tree.as_ref());
        assert_eq!(tokens.first().map(Token::kind), Some(TokenKind::StreamStart));
        assert_eq!(tokens.last().map(Token::kind), Some(TokenKind::StreamEnd));
    }

    #[test]
    fn block_scalar_value_is_resolved() {
        let buffer = "text: |\n  line one\n  line two\n";
        let tree = cst::parse(buffer);
        let tokens = token_stream(buffer, tree.as_ref());
        let scalar = tokens
            .iter()
            .filter_map(Token::scalar)
            .find(|(_, style)| style.is_block())
            .unwrap();
        assert_eq!(scalar.0, "line one\nline two\n");
    }

    #[test]
    fn resolve_literal_strip_chomping() {
        let (value, style) = resolve_block_scalar("|-\n  a\n  b\n");
        assert_eq!(style, ScalarStyle::Literal);
        assert_eq!(value, "a\nb");
    }

    #[test]
    fn resolve_folded_joins_lines() {
        let (value, style) = resolve_block_scalar(">\n  a\n  b\n\n  c\n");
        assert_eq!(style, ScalarStyle::Folded);
        assert_eq!(value, "a b\nc\n");
    }

    #[test]
    fn unquote_helpers() {
        assert_eq!(unquote_single("'it''s'"), "it's");
        assert_eq!(unquote_double("\"a\\nb\""), "a\nb");
    }
}
