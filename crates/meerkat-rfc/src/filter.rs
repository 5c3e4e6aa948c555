//! In-memory evaluation of `addressbook-query` filters (RFC 6352 §10.5).

use icu::casemap::CaseMapper;

use crate::dav::core::{
    AddressbookFilter, FilterTest, MatchType, ParamFilter, PropFilter, TextMatch,
};
use crate::vcard::{VCard, VCardProperty};

/// Collations accepted in `<CR:text-match collation=..>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// `i;octet`, case-sensitive.
    Octet,
    /// `i;ascii-casemap`.
    AsciiCasemap,
    /// `i;unicode-casemap`, the default.
    UnicodeCasemap,
}

/// A filter named a collation the server does not implement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported collation: {0}")]
pub struct UnsupportedCollation(pub String);

impl Collation {
    /// ## Errors
    /// Returns [`UnsupportedCollation`] for identifiers other than the three
    /// RFC 6352 mandates.
    pub fn from_identifier(collation: Option<&str>) -> Result<Self, UnsupportedCollation> {
        match collation {
            Some("i;octet") => Ok(Self::Octet),
            Some("i;ascii-casemap") => Ok(Self::AsciiCasemap),
            Some("i;unicode-casemap") | None => Ok(Self::UnicodeCasemap),
            Some(other) => Err(UnsupportedCollation(other.to_owned())),
        }
    }

    fn normalize(self, text: &str) -> String {
        match self {
            Self::Octet => text.to_owned(),
            Self::AsciiCasemap => text.to_ascii_lowercase(),
            Self::UnicodeCasemap => CaseMapper::new().fold_string(text).into_owned(),
        }
    }
}

/// ## Summary
/// Returns whether a card satisfies the filter. A filter without
/// prop-filters matches every card.
///
/// ## Errors
/// Returns [`UnsupportedCollation`] if any text-match names an unknown
/// collation.
pub fn matches(card: &VCard, filter: &AddressbookFilter) -> Result<bool, UnsupportedCollation> {
    if filter.prop_filters.is_empty() {
        return Ok(true);
    }

    let mut results = Vec::with_capacity(filter.prop_filters.len());
    for prop_filter in &filter.prop_filters {
        results.push(prop_filter_matches(card, prop_filter)?);
    }
    Ok(combine(filter.test, &results))
}

fn combine(test: FilterTest, results: &[bool]) -> bool {
    match test {
        FilterTest::AnyOf => results.iter().any(|r| *r),
        FilterTest::AllOf => results.iter().all(|r| *r),
    }
}

fn prop_filter_matches(card: &VCard, filter: &PropFilter) -> Result<bool, UnsupportedCollation> {
    let mut properties = card.get_properties(&filter.name).peekable();

    if filter.is_not_defined {
        return Ok(properties.peek().is_none());
    }
    if filter.text_matches.is_empty() && filter.param_filters.is_empty() {
        return Ok(properties.peek().is_some());
    }

    for property in properties {
        let mut results =
            Vec::with_capacity(filter.text_matches.len() + filter.param_filters.len());
        for text_match in &filter.text_matches {
            results.push(text_matches(&property.text_value(), text_match)?);
        }
        for param_filter in &filter.param_filters {
            results.push(param_filter_matches(property, param_filter)?);
        }
        if combine(filter.test, &results) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn param_filter_matches(
    property: &VCardProperty,
    filter: &ParamFilter,
) -> Result<bool, UnsupportedCollation> {
    let param = property.get_param(&filter.name);

    if filter.is_not_defined {
        return Ok(param.is_none());
    }
    let Some(param) = param else {
        return Ok(false);
    };
    let Some(text_match) = &filter.text_match else {
        return Ok(true);
    };

    for value in &param.values {
        if text_matches(value, text_match)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// ## Summary
/// Applies a single text-match to a value, honoring collation, match type
/// and negation.
///
/// ## Errors
/// Returns [`UnsupportedCollation`] for an unknown collation.
pub fn text_matches(value: &str, text_match: &TextMatch) -> Result<bool, UnsupportedCollation> {
    let collation = Collation::from_identifier(text_match.collation.as_deref())?;
    let haystack = collation.normalize(value);
    let needle = collation.normalize(&text_match.value);

    let matched = match text_match.match_type {
        MatchType::Equals => haystack == needle,
        MatchType::Contains => haystack.contains(&needle),
        MatchType::StartsWith => haystack.starts_with(&needle),
        MatchType::EndsWith => haystack.ends_with(&needle),
    };
    Ok(matched != text_match.negate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcard::parse_single;

    fn card() -> VCard {
        parse_single(
            "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:1\r\nFN:Jürgen Straße\r\n\
             EMAIL;TYPE=work:Juergen@Example.com\r\nTEL;TYPE=cell:+49 170 1234\r\n\
             END:VCARD\r\n",
        )
        .unwrap()
    }

    fn text(value: &str, match_type: MatchType) -> TextMatch {
        TextMatch {
            value: value.to_string(),
            collation: None,
            match_type,
            negate: false,
        }
    }

    fn with_text(name: &str, text_match: TextMatch) -> PropFilter {
        let mut filter = PropFilter::new(name);
        filter.text_matches.push(text_match);
        filter
    }

    #[test]
    fn empty_filter_matches() {
        assert!(matches(&card(), &AddressbookFilter::default()).unwrap());
    }

    #[test]
    fn unicode_casemap_folds() {
        let filter = AddressbookFilter {
            test: FilterTest::AnyOf,
            prop_filters: vec![with_text("FN", text("JÜRGEN", MatchType::StartsWith))],
        };
        assert!(matches(&card(), &filter).unwrap());
    }

    #[test]
    fn octet_is_case_sensitive() {
        let mut tm = text("juergen@", MatchType::StartsWith);
        tm.collation = Some("i;octet".to_string());
        assert!(!text_matches("Juergen@Example.com", &tm).unwrap());
        tm.collation = Some("i;ascii-casemap".to_string());
        assert!(text_matches("Juergen@Example.com", &tm).unwrap());
    }

    #[test]
    fn allof_and_anyof() {
        let prop_filters = vec![
            with_text("EMAIL", text("example.com", MatchType::EndsWith)),
            with_text("FN", text("nobody", MatchType::Contains)),
        ];
        let anyof = AddressbookFilter {
            test: FilterTest::AnyOf,
            prop_filters: prop_filters.clone(),
        };
        let allof = AddressbookFilter {
            test: FilterTest::AllOf,
            prop_filters,
        };
        assert!(matches(&card(), &anyof).unwrap());
        assert!(!matches(&card(), &allof).unwrap());
    }

    #[test]
    fn negate_and_is_not_defined() {
        let mut tm = text("example.com", MatchType::Contains);
        tm.negate = true;
        assert!(!text_matches("a@example.com", &tm).unwrap());

        let mut missing = PropFilter::new("NICKNAME");
        missing.is_not_defined = true;
        let filter = AddressbookFilter {
            test: FilterTest::AllOf,
            prop_filters: vec![missing],
        };
        assert!(matches(&card(), &filter).unwrap());
    }

    #[test]
    fn param_filter() {
        let mut tel = PropFilter::new("TEL");
        tel.param_filters.push(ParamFilter {
            name: "TYPE".to_string(),
            is_not_defined: false,
            text_match: Some(text("CELL", MatchType::Equals)),
        });
        let filter = AddressbookFilter {
            test: FilterTest::AnyOf,
            prop_filters: vec![tel],
        };
        assert!(matches(&card(), &filter).unwrap());
    }

    #[test]
    fn unknown_collation_is_an_error() {
        let mut tm = text("x", MatchType::Equals);
        tm.collation = Some("i;klingon".to_string());
        assert_eq!(
            text_matches("x", &tm).unwrap_err(),
            UnsupportedCollation("i;klingon".to_string())
        );
    }
}
