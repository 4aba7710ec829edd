//! Token, comment and line reconstruction.
//!
//! This module rebuilds the three positional streams every rule is written
//! against:
//!
//! - **Tokens** — a flat, PyYAML-style token stream with synthetic block-end
//!   markers, reconstructed from the concrete syntax tree ([`reconstruct`]).
//! - **Comments** — found by scanning the raw text between consecutive
//!   tokens for `#` (comments are not tokens).
//! - **Lines** — cheap views over each physical line of the buffer.
//!
//! [`elements`] merges all three into a single lazy stream ordered by line
//! number, with the guarantee that every token and comment on a line is
//! yielded before the line itself — the engine relies on that to treat a
//! [`Element::Line`] as the per-line flush point.

pub mod cst;
pub mod reconstruct;
pub mod token;

pub use token::{Mark, ScalarStyle, Token, TokenData, TokenKind};

/// A physical line of the buffer. `start..end` excludes the terminator.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// 1-based line number.
    pub line_no: usize,
    /// Byte offset of the first character of the line.
    pub start: usize,
    /// Byte offset one past the last content character (before `\n`/`\r\n`).
    pub end: usize,
    buffer: &'a str,
}

impl<'a> Line<'a> {
    /// The line's content, as a view into the buffer.
    pub fn content(&self) -> &'a str {
        &self.buffer[self.start..self.end]
    }

    /// The whole source buffer this line is a view into.
    pub fn buffer(&self) -> &'a str {
        self.buffer
    }
}

/// Split the buffer into [`Line`]s. A final line is always produced, even
/// when empty, so the merger has a flush point after the last token.
pub fn lines(buffer: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut line_no = 1;
    let mut cursor = 0;
    while let Some(nl) = buffer[cursor..].find('\n') {
        let nl = cursor + nl;
        let end = if nl > cursor && buffer.as_bytes()[nl - 1] == b'\r' {
            nl - 1
        } else {
            nl
        };
        out.push(Line {
            line_no,
            start: cursor,
            end,
            buffer,
        });
        cursor = nl + 1;
        line_no += 1;
    }
    out.push(Line {
        line_no,
        start: cursor,
        end: buffer.len(),
        buffer,
    });
    out
}

/// A `#` comment found between two tokens.
///
/// Holds back-references (arena indices) to the tokens bracketing it and to
/// the previous comment in the same gap; it owns none of them. Text is
/// computed lazily from the buffer.
#[derive(Debug, Clone)]
pub struct Comment {
    /// 1-based line number.
    pub line_no: usize,
    /// 1-based column number.
    pub column_no: usize,
    /// Byte offset of the `#`.
    pub pointer: usize,
    /// Index of the token before the gap this comment was found in.
    pub token_before: Option<usize>,
    /// Index of the token after the gap, if any.
    pub token_after: Option<usize>,
    /// Index of the previous comment in the same gap.
    pub comment_before: Option<usize>,
    /// Whether the comment shares its visual line with the token before it.
    pub inline: bool,
}

impl Comment {
    /// The comment text, from `#` to the end of the line.
    pub fn text<'a>(&self, buffer: &'a str) -> &'a str {
        let rest = &buffer[self.pointer..];
        match rest.find('\n') {
            Some(nl) => rest[..nl].trim_end_matches('\r'),
            None => rest,
        }
    }
}

/// Scan the gaps between consecutive tokens for comments.
///
/// A gap between two tokens on the same line is skipped entirely (no
/// comment fits in it — a comment always runs to the end of its line),
/// except around the zero-width stream delimiters.
pub fn comments(buffer: &str, tokens: &[Token]) -> Vec<Comment> {
    let mut out: Vec<Comment> = Vec::new();

    for i in 0..tokens.len() {
        let tok1 = &tokens[i];
        let tok2 = tokens.get(i + 1);

        let gap_end = match tok2 {
            Some(t2) => {
                if tok1.end_mark.line == t2.start_mark.line
                    && tok1.kind() != TokenKind::StreamStart
                    && t2.kind() != TokenKind::StreamEnd
                {
                    continue;
                }
                t2.start_mark.index
            }
            None => buffer.len(),
        };
        let gap_start = tok1.end_mark.index;
        if gap_start >= gap_end {
            continue;
        }

        let mut line_no = tok1.end_mark.line + 1;
        let mut column_base = tok1.end_mark.column + 1;
        let mut pointer = gap_start;
        let mut previous: Option<usize> = None;

        for segment in buffer[gap_start..gap_end].split('\n') {
            if let Some(pos) = segment.find('#') {
                let inline = match tok1.kind() {
                    TokenKind::StreamStart => false,
                    _ => {
                        line_no == tok1.end_mark.line + 1
                            && (tok1.end_mark.index == 0
                                || buffer.as_bytes()[tok1.end_mark.index - 1] != b'\n')
                    }
                };
                out.push(Comment {
                    line_no,
                    column_no: column_base + pos,
                    pointer: pointer + pos,
                    token_before: Some(i),
                    token_after: tok2.map(|_| i + 1),
                    comment_before: previous,
                    inline,
                });
                previous = Some(out.len() - 1);
            }
            pointer += segment.len() + 1;
            line_no += 1;
            column_base = 1;
        }
    }

    out
}

/// A token wrapped with its immediate neighbours, as rules consume it.
#[derive(Debug, Clone, Copy)]
pub struct TokenView<'a> {
    pub prev: Option<&'a Token>,
    pub curr: &'a Token,
    pub next: Option<&'a Token>,
    pub nextnext: Option<&'a Token>,
}

impl TokenView<'_> {
    pub fn line_no(&self) -> usize {
        self.curr.line_no()
    }
}

/// One element of the merged token/comment/line stream.
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    Token(TokenView<'a>),
    /// Index into the comment arena.
    Comment(usize),
    Line(Line<'a>),
}

/// Lazy merger of the token, comment and line streams.
///
/// Ordering is purely by line number: a line is withheld until no pending
/// token or comment has an equal-or-smaller line number.
pub struct ElementStream<'a> {
    tokens: &'a [Token],
    comments: &'a [Comment],
    lines: Vec<Line<'a>>,
    token_idx: usize,
    comment_idx: usize,
    line_idx: usize,
}

impl<'a> ElementStream<'a> {
    /// Line number of the next pending token-or-comment, tokens first at
    /// equal byte positions only when they start earlier.
    fn next_toc(&self) -> Option<(bool, usize)> {
        let tok = self.tokens.get(self.token_idx);
        let com = self.comments.get(self.comment_idx);
        match (tok, com) {
            (Some(t), Some(c)) => {
                if c.pointer < t.start_mark.index {
                    Some((false, c.line_no))
                } else {
                    Some((true, t.line_no()))
                }
            }
            (Some(t), None) => Some((true, t.line_no())),
            (None, Some(c)) => Some((false, c.line_no)),
            (None, None) => None,
        }
    }
}

impl<'a> Iterator for ElementStream<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Element<'a>> {
        let toc = self.next_toc();
        let line = self.lines.get(self.line_idx).copied();

        match (toc, line) {
            (None, None) => None,
            (Some((is_token, toc_line)), Some(l)) if toc_line <= l.line_no => {
                Some(self.take_toc(is_token))
            }
            (Some((is_token, _)), None) => Some(self.take_toc(is_token)),
            (_, Some(l)) => {
                self.line_idx += 1;
                Some(Element::Line(l))
            }
        }
    }
}

impl<'a> ElementStream<'a> {
    fn take_toc(&mut self, is_token: bool) -> Element<'a> {
        if is_token {
            let i = self.token_idx;
            self.token_idx += 1;
            Element::Token(TokenView {
                prev: i.checked_sub(1).and_then(|p| self.tokens.get(p)),
                curr: &self.tokens[i],
                next: self.tokens.get(i + 1),
                nextnext: self.tokens.get(i + 2),
            })
        } else {
            let i = self.comment_idx;
            self.comment_idx += 1;
            Element::Comment(i)
        }
    }
}

/// Merge tokens, comments and lines into a single line-ordered stream.
pub fn elements<'a>(
    buffer: &'a str,
    tokens: &'a [Token],
    comments: &'a [Comment],
) -> ElementStream<'a> {
    ElementStream {
        tokens,
        comments,
        lines: lines(buffer),
        token_idx: 0,
        comment_idx: 0,
        line_idx: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(buffer: &str) -> (Vec<Token>, Vec<Comment>) {
        let tree = cst::parse(buffer);
        let tokens = reconstruct::token_stream(buffer, tree.as_ref());
        let found = comments(buffer, &tokens);
        (tokens, found)
    }

    #[test]
    fn lines_exclude_terminators() {
        let ls = lines("a\nbc\r\n");
        assert_eq!(ls.len(), 3);
        assert_eq!(ls[0].content(), "a");
        assert_eq!(ls[1].content(), "bc");
        assert_eq!(ls[2].content(), "");
        assert_eq!(ls[2].line_no, 3);
    }

    #[test]
    fn final_line_without_newline() {
        let ls = lines("a: 1");
        assert_eq!(ls.len(), 1);
        assert_eq!(ls[0].content(), "a: 1");
    }

    #[test]
    fn finds_full_line_comment() {
        let buffer = "# leading\nkey: value\n";
        let (_tokens, comments) = build(buffer);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].line_no, 1);
        assert_eq!(comments[0].column_no, 1);
        assert_eq!(comments[0].text(buffer), "# leading");
        assert!(!comments[0].inline);
    }

    #[test]
    fn finds_inline_comment() {
        let buffer = "key: value  # note\n";
        let (_tokens, comments) = build(buffer);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].line_no, 1);
        assert_eq!(comments[0].column_no, 13);
        assert_eq!(comments[0].text(buffer), "# note");
        assert!(comments[0].inline);
    }

    #[test]
    fn chains_comments_in_the_same_gap() {
        let buffer = "key: value\n# one\n# two\nother: x\n";
        let (_tokens, comments) = build(buffer);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment_before, None);
        assert_eq!(comments[1].comment_before, Some(0));
        assert_eq!(comments[0].token_before, comments[1].token_before);
    }

    #[test]
    fn hash_inside_scalar_is_not_a_comment() {
        let buffer = "key: \"a # b\"\n";
        let (_tokens, comments) = build(buffer);
        assert!(comments.is_empty());
    }

    #[test]
    fn merged_stream_yields_tokens_before_their_line() {
        let buffer = "key: value  # note\nother: x\n";
        let (tokens, comments) = build(buffer);
        let mut emitted_tokens = 0;
        let mut emitted_comments = 0;
        for element in elements(buffer, &tokens, &comments) {
            match element {
                Element::Token(_) => emitted_tokens += 1,
                Element::Comment(_) => emitted_comments += 1,
                Element::Line(l) => {
                    // Everything on or before this line must already be out.
                    let due_tokens =
                        tokens.iter().filter(|t| t.line_no() <= l.line_no).count();
                    let due_comments =
                        comments.iter().filter(|c| c.line_no <= l.line_no).count();
                    assert!(emitted_tokens >= due_tokens);
                    assert!(emitted_comments >= due_comments);
                }
            }
        }
        assert_eq!(emitted_tokens, tokens.len());
        assert_eq!(emitted_comments, comments.len());
    }

    #[test]
    fn token_views_expose_lookahead() {
        let buffer = "key: value\n";
        let (tokens, comments) = build(buffer);
        let views: Vec<TokenView<'_>> = elements(buffer, &tokens, &comments)
            .filter_map(|e| match e {
                Element::Token(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(views.len(), tokens.len());
        assert!(views[0].prev.is_none());
        assert_eq!(views[1].prev.map(Token::kind), Some(TokenKind::StreamStart));
        assert_eq!(
            views[0].next.map(Token::kind),
            Some(TokenKind::BlockMappingStart)
        );
        assert!(views.last().unwrap().next.is_none());
    }
}
