//! REPORT request XML parsing (`addressbook-query`, `addressbook-multiget`).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::{ParseError, ParseResult};
use super::{NsScope, get_attribute, local_name};
use crate::dav::core::{
    AddressbookFilter, AddressbookQuery, FilterTest, Href, MatchType, ParamFilter, PropFilter,
    QName, ReportRequest, TextMatch,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Query,
    Multiget,
}

/// Parses a REPORT request body.
///
/// ## Errors
/// Returns an error if the XML is malformed, the root element is missing or
/// the report type is not a CardDAV report this server implements.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_report(xml: &[u8]) -> ParseResult<ReportRequest> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut scope = NsScope::default();
    let mut kind: Option<ReportKind> = None;
    let mut properties: Vec<QName> = Vec::new();
    let mut hrefs: Vec<Href> = Vec::new();
    let mut query = AddressbookQuery::default();
    let mut in_prop = false;
    let mut in_href = false;
    let mut in_nresults = false;
    let mut text_buf = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                scope.enter(e)?;
                let name = local_name(e)?;
                if kind.is_none() {
                    kind = Some(report_kind(&name)?);
                    buf.clear();
                    continue;
                }
                match name.as_str() {
                    "prop" if !in_prop => in_prop = true,
                    _ if in_prop => properties.push(scope.resolve(e)?),
                    "href" => {
                        in_href = true;
                        text_buf.clear();
                    }
                    "nresults" => {
                        in_nresults = true;
                        text_buf.clear();
                    }
                    "filter" => {
                        let test = filter_test(e)?;
                        let prop_filters = parse_filter_children(&mut reader)?;
                        query.filter = Some(AddressbookFilter { test, prop_filters });
                        scope.leave();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                scope.enter(e)?;
                let name = local_name(e)?;
                if kind.is_none() {
                    kind = Some(report_kind(&name)?);
                } else if in_prop {
                    properties.push(scope.resolve(e)?);
                }
                scope.leave();
            }
            Ok(Event::Text(ref e)) => {
                if in_href || in_nresults {
                    text_buf.push_str(&reader.decoder().decode(e.as_ref())?);
                }
            }
            Ok(Event::End(ref e)) => {
                match std::str::from_utf8(e.local_name().as_ref())? {
                    "prop" => in_prop = false,
                    "href" if in_href => {
                        in_href = false;
                        let href = text_buf.trim();
                        if !href.is_empty() {
                            hrefs.push(Href::new(href));
                        }
                    }
                    "nresults" if in_nresults => {
                        in_nresults = false;
                        query.limit = Some(parse_nresults(&text_buf)?);
                    }
                    _ => {}
                }
                scope.leave();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    match kind {
        Some(ReportKind::Query) => Ok(ReportRequest::AddressbookQuery { query, properties }),
        Some(ReportKind::Multiget) => Ok(ReportRequest::AddressbookMultiget { hrefs, properties }),
        None => Err(ParseError::missing_element("report root element")),
    }
}

fn report_kind(name: &str) -> ParseResult<ReportKind> {
    match name {
        "addressbook-query" => Ok(ReportKind::Query),
        "addressbook-multiget" => Ok(ReportKind::Multiget),
        other => Err(ParseError::unsupported_report(other)),
    }
}

/// Reads the `test` attribute; absent means `anyof` (RFC 6352 §10.5).
fn filter_test(e: &BytesStart<'_>) -> ParseResult<FilterTest> {
    Ok(match get_attribute(e, "test")?.as_deref() {
        Some("allof") => FilterTest::AllOf,
        _ => FilterTest::AnyOf,
    })
}

fn parse_nresults(value: &str) -> ParseResult<u32> {
    let trimmed = value.trim();
    trimmed
        .parse::<u32>()
        .map_err(|err| ParseError::invalid_value(format!("invalid nresults {trimmed:?}: {err}")))
}

/// Consumes the children of `<filter>` up to and including `</filter>`.
fn parse_filter_children(reader: &mut Reader<&[u8]>) -> ParseResult<Vec<PropFilter>> {
    let mut prop_filters = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if local_name(e)? == "prop-filter" => {
                let mut filter = prop_filter_header(e)?;
                parse_prop_filter_children(reader, &mut filter)?;
                prop_filters.push(filter);
            }
            Ok(Event::Empty(ref e)) if local_name(e)? == "prop-filter" => {
                prop_filters.push(prop_filter_header(e)?);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"filter" => break,
            Ok(Event::Eof) => return Err(ParseError::missing_element("/filter")),
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(prop_filters)
}

fn prop_filter_header(e: &BytesStart<'_>) -> ParseResult<PropFilter> {
    let name = get_attribute(e, "name")?.ok_or_else(|| ParseError::missing_attribute("name"))?;
    let mut filter = PropFilter::new(name);
    filter.test = filter_test(e)?;
    Ok(filter)
}

/// Consumes the children of `<prop-filter>` up to and including its end tag.
fn parse_prop_filter_children(
    reader: &mut Reader<&[u8]>,
    filter: &mut PropFilter,
) -> ParseResult<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e)?.as_str() {
                "text-match" => {
                    let text_match = parse_text_match(reader, e)?;
                    filter.text_matches.push(text_match);
                }
                "param-filter" => {
                    let mut param = param_filter_header(e)?;
                    parse_param_filter_children(reader, &mut param)?;
                    filter.param_filters.push(param);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e)?.as_str() {
                "is-not-defined" => filter.is_not_defined = true,
                "param-filter" => filter.param_filters.push(param_filter_header(e)?),
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"prop-filter" => break,
            Ok(Event::Eof) => return Err(ParseError::missing_element("/prop-filter")),
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn param_filter_header(e: &BytesStart<'_>) -> ParseResult<ParamFilter> {
    let name = get_attribute(e, "name")?.ok_or_else(|| ParseError::missing_attribute("name"))?;
    Ok(ParamFilter {
        name: name.to_ascii_uppercase(),
        ..ParamFilter::default()
    })
}

fn parse_param_filter_children(
    reader: &mut Reader<&[u8]>,
    param: &mut ParamFilter,
) -> ParseResult<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if local_name(e)? == "text-match" => {
                param.text_match = Some(parse_text_match(reader, e)?);
            }
            Ok(Event::Empty(ref e)) if local_name(e)? == "is-not-defined" => {
                param.is_not_defined = true;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"param-filter" => break,
            Ok(Event::Eof) => return Err(ParseError::missing_element("/param-filter")),
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Reads a `<text-match>` element whose start tag has just been consumed.
fn parse_text_match(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> ParseResult<TextMatch> {
    let collation = get_attribute(start, "collation")?;
    let negate = get_attribute(start, "negate-condition")?
        .is_some_and(|value| value == "yes" || value == "true");
    let match_type = get_attribute(start, "match-type")?
        .as_deref()
        .map_or(MatchType::Contains, MatchType::from_attr);

    let mut value = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(ref e)) => value.push_str(&reader.decoder().decode(e.as_ref())?),
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"text-match" => break,
            Ok(Event::Eof) => return Err(ParseError::missing_element("/text-match")),
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(TextMatch {
        value: value.trim().to_owned(),
        collation,
        match_type,
        negate,
    })
}
