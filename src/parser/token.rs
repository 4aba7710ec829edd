//! The positional token model.
//!
//! Every rule in this crate is written against a flat, PyYAML-style token
//! stream rather than a document tree: a token is a lexical unit with a
//! [`Mark`] on each side, typed by structural or scalar role. The
//! reconstructor in [`super::reconstruct`] produces these from a concrete
//! syntax tree.

/// A position in the source buffer.
///
/// Lines and columns are 0-based (problems reported to users are 1-based;
/// the conversion happens where problems are created). `index` is the byte
/// offset into the buffer the token stream was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    /// Line number, 0-based.
    pub line: usize,
    /// Column number, 0-based, in bytes from the line start.
    pub column: usize,
    /// Byte offset into the source buffer.
    pub index: usize,
}

impl Mark {
    pub fn new(line: usize, column: usize, index: usize) -> Self {
        Self {
            line,
            column,
            index,
        }
    }
}

/// Style of a scalar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// Block scalar introduced by `|`.
    Literal,
    /// Block scalar introduced by `>`.
    Folded,
}

impl ScalarStyle {
    /// Whether the scalar is quoted (single or double).
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }

    /// Whether the scalar is a block scalar (`|` or `>`).
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

/// Token payload, one variant per token kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Directive {
        /// Literal directive text, e.g. `%YAML 1.2`.
        text: String,
    },
    BlockMappingStart,
    BlockSequenceStart,
    /// Synthetic close of a block mapping or sequence. YAML has no closing
    /// delimiter for block scopes; these are reconstructed from indentation.
    BlockEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    Key,
    Value,
    BlockEntry,
    FlowEntry,
    Alias {
        value: String,
    },
    Anchor {
        value: String,
    },
    Tag {
        text: String,
    },
    Scalar {
        /// Reportable value: literal text for plain/quoted scalars, the
        /// resolved logical value (indentation stripped, lines folded) for
        /// block scalars.
        value: String,
        style: ScalarStyle,
    },
}

/// Discriminant-only view of [`TokenData`], used for rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Directive,
    BlockMappingStart,
    BlockSequenceStart,
    BlockEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    Key,
    Value,
    BlockEntry,
    FlowEntry,
    Alias,
    Anchor,
    Tag,
    Scalar,
}

/// A token positioned in source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Mark,
    /// The end of the token (exclusive).
    pub end_mark: Mark,
}

impl Token {
    pub fn new(data: TokenData, start_mark: Mark, end_mark: Mark) -> Self {
        Self {
            data,
            start_mark,
            end_mark,
        }
    }

    /// Zero-width token at a single position.
    pub fn at(data: TokenData, mark: Mark) -> Self {
        Self::new(data, mark, mark)
    }

    pub fn kind(&self) -> TokenKind {
        self.data.kind()
    }

    /// The scalar value and style, if this is a scalar token.
    pub fn scalar(&self) -> Option<(&str, ScalarStyle)> {
        match &self.data {
            TokenData::Scalar { value, style } => Some((value.as_str(), *style)),
            _ => None,
        }
    }

    /// 1-based line the token starts on, for stream-merging purposes.
    pub fn line_no(&self) -> usize {
        self.start_mark.line + 1
    }
}

impl TokenData {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenData::StreamStart => TokenKind::StreamStart,
            TokenData::StreamEnd => TokenKind::StreamEnd,
            TokenData::DocumentStart => TokenKind::DocumentStart,
            TokenData::DocumentEnd => TokenKind::DocumentEnd,
            TokenData::Directive { .. } => TokenKind::Directive,
            TokenData::BlockMappingStart => TokenKind::BlockMappingStart,
            TokenData::BlockSequenceStart => TokenKind::BlockSequenceStart,
            TokenData::BlockEnd => TokenKind::BlockEnd,
            TokenData::FlowMappingStart => TokenKind::FlowMappingStart,
            TokenData::FlowMappingEnd => TokenKind::FlowMappingEnd,
            TokenData::FlowSequenceStart => TokenKind::FlowSequenceStart,
            TokenData::FlowSequenceEnd => TokenKind::FlowSequenceEnd,
            TokenData::Key => TokenKind::Key,
            TokenData::Value => TokenKind::Value,
            TokenData::BlockEntry => TokenKind::BlockEntry,
            TokenData::FlowEntry => TokenKind::FlowEntry,
            TokenData::Alias { .. } => TokenKind::Alias,
            TokenData::Anchor { .. } => TokenKind::Anchor,
            TokenData::Tag { .. } => TokenKind::Tag,
            TokenData::Scalar { .. } => TokenKind::Scalar,
        }
    }
}
