//! vCard parse error types.

use std::fmt;

/// Result type for vCard parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred during vCard parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Logical (unfolded) line number, 1-based.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The kind of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input ended inside a card.
    UnexpectedEof,
    /// A line appeared where it is not allowed.
    UnexpectedToken,
    /// A required property (VERSION) is absent.
    MissingProperty,
    InvalidPropertyName,
    InvalidParameter,
    UnsupportedVersion,
    /// The document holds no card at all.
    Empty,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnexpectedToken => write!(f, "unexpected token"),
            Self::MissingProperty => write!(f, "missing property"),
            Self::InvalidPropertyName => write!(f, "invalid property name"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
            Self::Empty => write!(f, "no vCard found"),
        }
    }
}
