//! Content-line lexing: unfolding (RFC 6350 §3.2) and the
//! `[group.]name[;param=value]*:value` grammar.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::vcard::core::VCardParameter;

/// Unfolds a document by removing CRLF (or bare LF) followed by a single
/// space or tab.
#[must_use]
pub fn unfold(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let newline = match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                true
            }
            '\n' => true,
            _ => false,
        };

        if !newline {
            result.push(c);
        } else if matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        } else {
            result.push('\n');
        }
    }

    result
}

/// A parsed content line before value interpretation.
#[derive(Debug, Clone)]
pub struct ContentLine {
    pub group: Option<String>,
    /// Property name (uppercase).
    pub name: String,
    pub params: Vec<VCardParameter>,
    /// Raw value string.
    pub value: String,
}

/// Parses a single unfolded content line.
///
/// ## Errors
/// Returns an error if the line has no value separator or an invalid name.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let colon_pos = find_value_separator(line).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::InvalidPropertyName,
            line_num,
            "missing colon separator",
        )
    })?;

    let (name_params, value) = line.split_at(colon_pos);
    let value = &value[1..];

    let (group, name_params) = parse_group(name_params);

    let (name, params_str) = match name_params.split_once(';') {
        Some((name, params)) => (name, Some(params)),
        None => (name_params, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPropertyName,
            line_num,
            format!("invalid property name: {name}"),
        ));
    }

    let params = match params_str {
        Some(params_str) => parse_parameters(params_str, line_num)?,
        None => Vec::new(),
    };

    Ok(ContentLine {
        group: group.map(String::from),
        name: name.to_ascii_uppercase(),
        params,
        value: value.to_string(),
    })
}

/// Finds the colon that separates name/params from value, skipping quoted
/// parameter values.
fn find_value_separator(line: &str) -> Option<usize> {
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => return Some(i),
            _ => {}
        }
    }

    None
}

fn parse_group(s: &str) -> (Option<&str>, &str) {
    let head = s.split(';').next().unwrap_or(s);
    if let Some((group, _)) = head.split_once('.')
        && !group.is_empty()
        && group.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return (Some(group), &s[group.len() + 1..]);
    }
    (None, s)
}

fn parse_parameters(s: &str, line_num: usize) -> ParseResult<Vec<VCardParameter>> {
    let mut params = Vec::new();
    let mut remaining = s;

    while !remaining.is_empty() {
        let (param, rest) = parse_single_parameter(remaining, line_num)?;
        params.push(param);
        remaining = rest;
    }

    Ok(params)
}

/// Parses one parameter and returns the unconsumed remainder.
///
/// vCard 2.1/3.0 producers still emit bare type tokens (`TEL;CELL:...`);
/// those become `TYPE` values.
fn parse_single_parameter(s: &str, line_num: usize) -> ParseResult<(VCardParameter, &str)> {
    let name_end = s.find(['=', ';']).unwrap_or(s.len());
    let name = &s[..name_end];

    if name.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            "empty parameter name",
        ));
    }

    if s[name_end..].starts_with('=') {
        let (values, remaining) = parse_param_values(&s[name_end + 1..]);
        return Ok((VCardParameter::multi(name, values), remaining));
    }

    let remaining = s[name_end..].strip_prefix(';').unwrap_or("");
    Ok((VCardParameter::type_param(name), remaining))
}

/// Parses comma-separated, possibly quoted, parameter values with RFC 6868
/// caret decoding.
fn parse_param_values(s: &str) -> (Vec<String>, &str) {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            ';' if !in_quotes => {
                values.push(current);
                return (values, &s[i + 1..]);
            }
            '^' => match chars.peek().map(|&(_, next)| next) {
                Some('n') => {
                    chars.next();
                    current.push('\n');
                }
                Some('\'') => {
                    chars.next();
                    current.push('"');
                }
                Some('^') => {
                    chars.next();
                    current.push('^');
                }
                _ => current.push('^'),
            },
            _ => current.push(c),
        }
    }

    values.push(current);
    (values, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfold_crlf_lf_and_tab() {
        assert_eq!(unfold("FN:John\r\n Doe"), "FN:JohnDoe");
        assert_eq!(unfold("FN:John\n Doe"), "FN:JohnDoe");
        assert_eq!(unfold("FN:John\r\n\tDoe"), "FN:JohnDoe");
        assert_eq!(unfold("A:1\r\nB:2"), "A:1\nB:2");
    }

    #[test]
    fn parse_simple_line() {
        let line = parse_content_line("FN:John Doe", 1).unwrap();
        assert!(line.group.is_none());
        assert_eq!(line.name, "FN");
        assert!(line.params.is_empty());
        assert_eq!(line.value, "John Doe");
    }

    #[test]
    fn parse_grouped_line() {
        let line = parse_content_line("item1.TEL:+1-555-555-5555", 1).unwrap();
        assert_eq!(line.group.as_deref(), Some("item1"));
        assert_eq!(line.name, "TEL");
    }

    #[test]
    fn dot_inside_parameter_is_not_a_group() {
        let line = parse_content_line("PHOTO;MEDIATYPE=image/x.y:abc", 1).unwrap();
        assert!(line.group.is_none());
        assert_eq!(line.name, "PHOTO");
    }

    #[test]
    fn parse_with_parameters() {
        let line = parse_content_line("TEL;TYPE=home,voice;PREF=1:+1-555-555-5555", 1).unwrap();
        assert_eq!(line.params.len(), 2);
        assert_eq!(line.params[0].values, vec!["home", "voice"]);
        assert_eq!(line.params[1].name, "PREF");
        assert_eq!(line.params[1].value(), Some("1"));
    }

    #[test]
    fn bare_parameter_becomes_type() {
        let line = parse_content_line("TEL;CELL;PREF=1:123", 1).unwrap();
        assert_eq!(line.params[0].name, "TYPE");
        assert_eq!(line.params[0].value(), Some("CELL"));
        assert_eq!(line.params[1].name, "PREF");
    }

    #[test]
    fn quoted_param_may_hold_colon_and_caret() {
        let line = parse_content_line("ADR;LABEL=\"a:b^nc\":;;street", 1).unwrap();
        assert_eq!(line.params[0].value(), Some("a:b\nc"));
        assert_eq!(line.value, ";;street");
    }

    #[test]
    fn colon_in_value() {
        let line = parse_content_line("URL:https://example.com:8080/path", 1).unwrap();
        assert_eq!(line.value, "https://example.com:8080/path");
    }

    #[test]
    fn missing_colon_is_an_error() {
        let err = parse_content_line("FN John", 3).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, ParseErrorKind::InvalidPropertyName);
    }
}
