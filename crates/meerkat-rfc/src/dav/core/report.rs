//! CardDAV REPORT request types (RFC 6352 §8.6, §8.7).

use super::href::Href;
use super::namespace::QName;

/// A parsed REPORT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    AddressbookQuery {
        query: AddressbookQuery,
        properties: Vec<QName>,
    },
    AddressbookMultiget {
        hrefs: Vec<Href>,
        properties: Vec<QName>,
    },
}

impl ReportRequest {
    /// Properties requested for every matching resource.
    #[must_use]
    pub fn properties(&self) -> &[QName] {
        match self {
            Self::AddressbookQuery { properties, .. }
            | Self::AddressbookMultiget { properties, .. } => properties,
        }
    }
}

/// The body of an `addressbook-query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressbookQuery {
    /// `None` matches every card.
    pub filter: Option<AddressbookFilter>,
    /// `<D:limit><D:nresults>` value.
    pub limit: Option<u32>,
}

/// Whether all or any of a set of tests must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterTest {
    #[default]
    AnyOf,
    AllOf,
}

/// `<CR:filter>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressbookFilter {
    pub test: FilterTest,
    pub prop_filters: Vec<PropFilter>,
}

/// `<CR:prop-filter>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropFilter {
    /// vCard property name, uppercase.
    pub name: String,
    pub test: FilterTest,
    pub is_not_defined: bool,
    pub text_matches: Vec<TextMatch>,
    pub param_filters: Vec<ParamFilter>,
}

impl PropFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            ..Self::default()
        }
    }
}

/// `<CR:param-filter>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamFilter {
    /// Parameter name, uppercase.
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatch>,
}

/// `<CR:text-match>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub value: String,
    /// Collation identifier; `None` means `i;unicode-casemap`.
    pub collation: Option<String>,
    pub match_type: MatchType,
    pub negate: bool,
}

/// `match-type` attribute values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchType {
    Equals,
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchType {
    #[must_use]
    pub fn from_attr(value: &str) -> Self {
        match value {
            "equals" => Self::Equals,
            "starts-with" => Self::StartsWith,
            "ends-with" => Self::EndsWith,
            _ => Self::Contains,
        }
    }
}
