//! DAV XML parse error types.

use std::fmt;

/// Result type for DAV XML parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred during DAV XML parsing.
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn xml(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::XmlError, message)
    }

    #[must_use]
    pub fn missing_element(name: &str) -> Self {
        Self::new(
            ParseErrorKind::MissingElement,
            format!("missing required element: {name}"),
        )
    }

    #[must_use]
    pub fn unsupported_report(name: &str) -> Self {
        Self::new(
            ParseErrorKind::UnsupportedReport,
            format!("unsupported report: {name}"),
        )
    }

    #[must_use]
    pub fn missing_attribute(name: &str) -> Self {
        Self::new(
            ParseErrorKind::MissingAttribute,
            format!("missing required attribute: {name}"),
        )
    }

    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidValue, message)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        Self::xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::xml(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::new(ParseErrorKind::EncodingError, err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for ParseError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        Self::new(ParseErrorKind::EncodingError, err.to_string())
    }
}

/// Parse error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    XmlError,
    MissingElement,
    MissingAttribute,
    UnsupportedReport,
    InvalidValue,
    EncodingError,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XmlError => write!(f, "XML error"),
            Self::MissingElement => write!(f, "missing element"),
            Self::MissingAttribute => write!(f, "missing attribute"),
            Self::UnsupportedReport => write!(f, "unsupported report"),
            Self::InvalidValue => write!(f, "invalid value"),
            Self::EncodingError => write!(f, "encoding error"),
        }
    }
}
