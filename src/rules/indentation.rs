//! Controls indentation.
//!
//! The check mirrors the document structure with a stack of frames, one per
//! open construct (mapping, sequence, sequence entry, key, value). Each
//! frame records the column its content is expected at; every token that
//! starts a line is compared against the top frame, then the stack is
//! updated from the token and one or two tokens of lookahead.
//!
//! `spaces: consistent` and `indent-sequences: consistent` start unresolved
//! and lock in on the first construct that exhibits a choice; the rest of
//! the file is then held to it.
//!
//! A negative frame indent encodes a lower bound rather than an exact
//! column: `-(n) - 1` means "at least n". Flow collections continued on the
//! next line use this, since their content may sit at any deeper column.

use std::any::Any;
use std::sync::LazyLock;

use crate::linter::LintProblem;
use crate::parser::{ScalarStyle, Token, TokenKind, TokenView};
use crate::rules::{OptionKind, OptionSpec, OptionValue, Rule, RuleCategory, RuleOptions};

pub struct Indentation;

static OPTIONS: LazyLock<Vec<OptionSpec>> = LazyLock::new(|| {
    vec![
        OptionSpec::new(
            "spaces",
            OptionKind::IntOrKeyword(&["consistent"]),
            OptionValue::Str("consistent".to_string()),
        ),
        OptionSpec::new(
            "indent-sequences",
            OptionKind::BoolOrKeyword(&["whatever", "consistent"]),
            OptionValue::Bool(true),
        ),
        OptionSpec::new(
            "check-multi-line-strings",
            OptionKind::Bool,
            OptionValue::Bool(false),
        ),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    BlockMap,
    FlowMap,
    BlockSeq,
    FlowSeq,
    /// A `-` sequence entry.
    Entry,
    Key,
    Val,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    /// Expected content column; negative encodes "at least `-indent - 1`".
    indent: i64,
    /// Indent of the line the frame was opened on (flow frames only).
    line_indent: usize,
    explicit_key: bool,
    /// Zero-indented block sequence, which has no start/end tokens.
    implicit_block_seq: bool,
}

impl Frame {
    fn new(kind: FrameKind, indent: i64) -> Self {
        Self {
            kind,
            indent,
            line_indent: 0,
            explicit_key: false,
            implicit_block_seq: false,
        }
    }
}

/// How sequences under a mapping key are expected to be indented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeqStyle {
    Always,
    Never,
    Whatever,
    /// Unresolved; locks into Always or Never on first observation.
    Consistent,
}

#[derive(Debug)]
struct Context {
    stack: Vec<Frame>,
    /// Last line (1-based) covered by a visible token; -1 before the first.
    cur_line: i64,
    cur_line_indent: usize,
    /// Indent unit, once known.
    spaces: Option<i64>,
    seq_style: SeqStyle,
    initialized: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Root, 0)],
            cur_line: -1,
            cur_line_indent: 0,
            spaces: None,
            seq_style: SeqStyle::Always,
            initialized: false,
        }
    }
}

impl Context {
    fn init(&mut self, opts: &RuleOptions) {
        if self.initialized {
            return;
        }
        self.spaces = opts.int("spaces");
        self.seq_style = match opts.get("indent-sequences") {
            Some(OptionValue::Bool(true)) => SeqStyle::Always,
            Some(OptionValue::Bool(false)) => SeqStyle::Never,
            Some(OptionValue::Str(s)) if s == "consistent" => SeqStyle::Consistent,
            _ => SeqStyle::Whatever,
        };
        self.initialized = true;
    }

    fn top(&self) -> Frame {
        *self.stack.last().expect("root frame never popped")
    }
}

/// `base + spaces`, learning `spaces` from `next` if still unresolved.
fn detect_indent(spaces: &mut Option<i64>, base: i64, next_column: i64) -> i64 {
    let unit = match *spaces {
        Some(unit) => unit,
        None => {
            let unit = next_column - base;
            *spaces = Some(unit);
            unit
        }
    };
    base + unit
}

/// The 1-based line a token really ends on, ignoring trailing whitespace
/// consumed into multi-line scalars.
fn real_end_line(buffer: &str, token: &Token) -> usize {
    let mut end_line = token.end_mark.line + 1;
    if token.kind() != TokenKind::Scalar {
        return end_line;
    }
    let bytes = buffer.as_bytes();
    let mut pos = token.end_mark.index.min(bytes.len());
    while pos > token.start_mark.index {
        let b = bytes[pos - 1];
        if !b.is_ascii_whitespace() {
            break;
        }
        if b == b'\n' {
            end_line -= 1;
        }
        pos -= 1;
    }
    end_line
}

impl Rule for Indentation {
    fn id(&self) -> &'static str {
        "indentation"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Token
    }

    fn options(&self) -> &'static [OptionSpec] {
        OPTIONS.as_slice()
    }

    fn new_context(&self) -> Option<Box<dyn Any + Send>> {
        Some(Box::new(Context::default()))
    }

    fn check_token(
        &self,
        opts: &RuleOptions,
        buffer: &str,
        token: &TokenView<'_>,
        context: &mut (dyn Any + Send),
    ) -> Vec<LintProblem> {
        let ctx = match context.downcast_mut::<Context>() {
            Some(ctx) => ctx,
            None => return Vec::new(),
        };
        ctx.init(opts);

        let mut problems = Vec::new();
        let curr = token.curr;
        let kind = curr.kind();
        let next_kind = token.next.map(Token::kind);

        let is_visible = !matches!(
            kind,
            TokenKind::StreamStart | TokenKind::StreamEnd | TokenKind::BlockEnd
        ) && curr.scalar().map_or(true, |(v, _)| !v.is_empty());
        let first_in_line = is_visible && curr.start_mark.line as i64 + 1 > ctx.cur_line;

        let found = curr.start_mark.column as i64;

        if first_in_line {
            let top = ctx.top();
            let expected = if matches!(
                kind,
                TokenKind::FlowMappingEnd | TokenKind::FlowSequenceEnd
            ) {
                top.line_indent as i64
            } else if top.kind == FrameKind::Key
                && top.explicit_key
                && kind != TokenKind::Value
            {
                detect_indent(&mut ctx.spaces, top.indent, found)
            } else {
                top.indent
            };

            if found != expected {
                if expected < 0 {
                    let at_least = -expected - 1;
                    if found < at_least {
                        problems.push(LintProblem::new(
                            curr.start_mark.line + 1,
                            (found + 1) as usize,
                            format!("wrong indentation: expected at least {at_least}"),
                        ));
                    }
                } else {
                    problems.push(LintProblem::new(
                        curr.start_mark.line + 1,
                        (found + 1) as usize,
                        format!("wrong indentation: expected {expected} but found {found}"),
                    ));
                }
            }
        }

        if kind == TokenKind::Scalar && opts.bool("check-multi-line-strings") {
            problems.extend(check_scalar_indentation(ctx, buffer, curr));
        }

        // Track line coverage before mutating the stack.
        if is_visible {
            ctx.cur_line = real_end_line(buffer, curr) as i64;
            if first_in_line {
                ctx.cur_line_indent = found as usize;
            }
        }

        match kind {
            TokenKind::BlockMappingStart => {
                ctx.stack.push(Frame::new(FrameKind::BlockMap, found));
            }
            TokenKind::BlockSequenceStart => {
                ctx.stack.push(Frame::new(FrameKind::BlockSeq, found));
            }
            TokenKind::FlowMappingStart | TokenKind::FlowSequenceStart => {
                let frame_kind = if kind == TokenKind::FlowMappingStart {
                    FrameKind::FlowMap
                } else {
                    FrameKind::FlowSeq
                };
                let indent = match token.next {
                    Some(next) if next.start_mark.line == curr.start_mark.line => {
                        next.start_mark.column as i64
                    }
                    // Content on later lines may sit anywhere deeper than
                    // the opening line.
                    _ => -(ctx.cur_line_indent as i64 + 1) - 1,
                };
                let mut frame = Frame::new(frame_kind, indent);
                frame.line_indent = ctx.cur_line_indent;
                ctx.stack.push(frame);
            }
            TokenKind::BlockEntry
                if !matches!(
                    next_kind,
                    Some(TokenKind::BlockEntry) | Some(TokenKind::BlockEnd)
                ) =>
            {
                // Zero-indented sequences have no start token; open the
                // frame for them here.
                if ctx.top().kind != FrameKind::BlockSeq {
                    let mut frame = Frame::new(FrameKind::BlockSeq, found);
                    frame.implicit_block_seq = true;
                    ctx.stack.push(frame);
                }
                let indent = match token.next {
                    Some(next) if next.start_mark.line == curr.end_mark.line => {
                        next.start_mark.column as i64
                    }
                    Some(next) => {
                        detect_indent(&mut ctx.spaces, found, next.start_mark.column as i64)
                    }
                    None => found,
                };
                ctx.stack.push(Frame::new(FrameKind::Entry, indent));
            }
            TokenKind::Key => {
                let mut frame = Frame::new(FrameKind::Key, ctx.top().indent);
                frame.explicit_key = curr.start_mark.index < curr.end_mark.index;
                ctx.stack.push(frame);
            }
            TokenKind::Value if ctx.top().kind == FrameKind::Key => {
                // An anchor or tag on the key's line belongs to the value
                // below; look one token further for the value itself.
                let mut next = token.next;
                if let (Some(n), Some(prev), Some(nn)) =
                    (token.next, token.prev, token.nextnext)
                {
                    if matches!(n.kind(), TokenKind::Anchor | TokenKind::Tag)
                        && n.start_mark.line == prev.start_mark.line
                        && n.start_mark.line < nn.start_mark.line
                    {
                        next = token.nextnext;
                    }
                }
                if let Some(next) = next {
                    if !matches!(
                        next.kind(),
                        TokenKind::Key
                            | TokenKind::Value
                            | TokenKind::BlockEnd
                            | TokenKind::FlowMappingEnd
                            | TokenKind::FlowSequenceEnd
                            | TokenKind::FlowEntry
                            | TokenKind::DocumentStart
                            | TokenKind::DocumentEnd
                            | TokenKind::StreamEnd
                    ) {
                        let top = ctx.top();
                        let next_col = next.start_mark.column as i64;
                        let indent = if top.explicit_key {
                            detect_indent(&mut ctx.spaces, top.indent, next_col)
                        } else if token
                            .prev
                            .map_or(false, |p| next.start_mark.line == p.start_mark.line)
                        {
                            next_col
                        } else if matches!(
                            next.kind(),
                            TokenKind::BlockSequenceStart | TokenKind::BlockEntry
                        ) {
                            self.sequence_value_indent(ctx, top.indent, next_col)
                        } else {
                            detect_indent(&mut ctx.spaces, top.indent, next_col)
                        };
                        ctx.stack.push(Frame::new(FrameKind::Val, indent));
                    }
                }
            }
            _ => {}
        }

        self.pop_closed_frames(ctx, token, kind, next_kind);

        problems
    }
}

impl Indentation {
    /// Expected column of a block sequence appearing as a mapping value.
    fn sequence_value_indent(&self, ctx: &mut Context, base: i64, next_col: i64) -> i64 {
        match ctx.seq_style {
            SeqStyle::Never => base,
            SeqStyle::Always => {
                if ctx.spaces.is_none() && next_col == base {
                    // The sequence should be indented but is not, and the
                    // indent unit is still unknown; pick the usual 2.
                    base + 2
                } else {
                    detect_indent(&mut ctx.spaces, base, next_col)
                }
            }
            SeqStyle::Whatever | SeqStyle::Consistent => {
                if next_col == base {
                    if ctx.seq_style == SeqStyle::Consistent {
                        ctx.seq_style = SeqStyle::Never;
                    }
                    base
                } else {
                    if ctx.seq_style == SeqStyle::Consistent {
                        ctx.seq_style = SeqStyle::Always;
                    }
                    detect_indent(&mut ctx.spaces, base, next_col)
                }
            }
        }
    }

    /// Pop every frame the current token closes. Branch order matters:
    /// frames closed by this very token come first, then frames closed by
    /// what the lookahead shows.
    fn pop_closed_frames(
        &self,
        ctx: &mut Context,
        token: &TokenView<'_>,
        kind: TokenKind,
        next_kind: Option<TokenKind>,
    ) {
        let next_col = token.next.map(|n| n.start_mark.column as i64);
        let mut consumed = false;
        loop {
            let len = ctx.stack.len();
            let top = ctx.top();
            let under = (len >= 2).then(|| ctx.stack[len - 2]);

            if top.kind == FrameKind::FlowSeq
                && kind == TokenKind::FlowSequenceEnd
                && !consumed
            {
                ctx.stack.pop();
                consumed = true;
            } else if top.kind == FrameKind::FlowMap
                && kind == TokenKind::FlowMappingEnd
                && !consumed
            {
                ctx.stack.pop();
                consumed = true;
            } else if matches!(top.kind, FrameKind::BlockMap | FrameKind::BlockSeq)
                && kind == TokenKind::BlockEnd
                && !top.implicit_block_seq
                && !consumed
            {
                ctx.stack.pop();
                consumed = true;
            } else if top.kind == FrameKind::Entry
                && kind != TokenKind::BlockEntry
                && matches!(
                    next_kind,
                    Some(TokenKind::BlockEntry) | Some(TokenKind::BlockEnd)
                )
            {
                ctx.stack.pop();
            } else if top.kind == FrameKind::Entry
                && under.map_or(false, |u| u.implicit_block_seq)
                && !matches!(kind, TokenKind::Anchor | TokenKind::Tag)
                && next_kind != Some(TokenKind::BlockEntry)
                && next_col.map_or(false, |c| {
                    under.map_or(false, |u| c <= u.indent)
                })
            {
                ctx.stack.pop();
            } else if top.kind == FrameKind::BlockSeq
                && top.implicit_block_seq
                && kind != TokenKind::BlockEntry
                && next_kind != Some(TokenKind::BlockEntry)
            {
                ctx.stack.pop();
            } else if top.kind == FrameKind::Val
                && under.map_or(false, |u| u.kind == FrameKind::Key)
                && !matches!(
                    kind,
                    TokenKind::Value | TokenKind::Anchor | TokenKind::Tag
                )
            {
                // The value ended; its key frame goes with it.
                ctx.stack.pop();
                ctx.stack.pop();
            } else if top.kind == FrameKind::Key
                && kind == TokenKind::Value
                && matches!(
                    next_kind,
                    Some(TokenKind::Key)
                        | Some(TokenKind::FlowEntry)
                        | Some(TokenKind::BlockEnd)
                        | Some(TokenKind::FlowMappingEnd)
                        | Some(TokenKind::FlowSequenceEnd)
                        | Some(TokenKind::DocumentStart)
                        | Some(TokenKind::DocumentEnd)
                        | Some(TokenKind::StreamEnd)
                )
            {
                // Key with an empty value.
                ctx.stack.pop();
            } else if top.kind == FrameKind::Key
                && matches!(
                    next_kind,
                    Some(TokenKind::BlockEnd)
                        | Some(TokenKind::DocumentStart)
                        | Some(TokenKind::DocumentEnd)
                        | Some(TokenKind::StreamEnd)
                )
            {
                // Key with no value token at all.
                ctx.stack.pop();
            } else {
                break;
            }
        }
    }
}

/// Per-line indentation inside multi-line scalars.
fn check_scalar_indentation(ctx: &mut Context, buffer: &str, token: &Token) -> Vec<LintProblem> {
    if token.start_mark.line == token.end_mark.line {
        return Vec::new();
    }
    let style = match token.scalar() {
        Some((_, style)) => style,
        None => return Vec::new(),
    };

    let bytes = buffer.as_bytes();
    let mut problems = Vec::new();
    let mut expected: Option<i64> = None;
    let mut line_no = token.start_mark.line + 1;
    let mut line_start = token.start_mark.index;
    let scan_end = token.end_mark.index.saturating_sub(1);

    while line_start < scan_end {
        let newline = match buffer[line_start..scan_end].find('\n') {
            Some(rel) => line_start + rel,
            None => break,
        };
        line_start = newline + 1;
        line_no += 1;

        let mut indent = 0;
        while line_start + indent < bytes.len() && bytes[line_start + indent] == b' ' {
            indent += 1;
        }
        if line_start + indent >= bytes.len() || bytes[line_start + indent] == b'\n' {
            continue;
        }

        let exp = match expected {
            Some(e) => e,
            None => {
                let e = expected_scalar_indent(ctx, token, style, indent as i64);
                expected = Some(e);
                e
            }
        };
        if indent as i64 != exp {
            problems.push(LintProblem::new(
                line_no,
                indent + 1,
                format!("wrong indentation: expected {exp}"),
            ));
        }
    }
    problems
}

/// Expected indent of a multi-line scalar's continuation lines, derived
/// from the first continuation line when the indent unit is unresolved.
fn expected_scalar_indent(
    ctx: &mut Context,
    token: &Token,
    style: ScalarStyle,
    found: i64,
) -> i64 {
    let col = token.start_mark.column as i64;
    match style {
        ScalarStyle::Plain => col,
        ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => col + 1,
        ScalarStyle::Literal | ScalarStyle::Folded => {
            let detect = |spaces: &mut Option<i64>, base: i64| match *spaces {
                Some(unit) => base + unit,
                None => {
                    *spaces = Some(found - base);
                    found
                }
            };
            let len = ctx.stack.len();
            let top = ctx.stack[len - 1];
            match top.kind {
                FrameKind::Entry => detect(&mut ctx.spaces, col),
                FrameKind::Key => detect(&mut ctx.spaces, col),
                FrameKind::Val => {
                    let under = (len >= 2).then(|| ctx.stack[len - 2]);
                    if token.start_mark.line as i64 + 1 > ctx.cur_line {
                        detect(&mut ctx.spaces, top.indent)
                    } else if under.map_or(false, |u| u.explicit_key) {
                        detect(&mut ctx.spaces, col)
                    } else {
                        detect(&mut ctx.spaces, under.map_or(top.indent, |u| u.indent))
                    }
                }
                _ => detect(&mut ctx.spaces, top.indent),
            }
        }
    }
}
