//! PROPFIND request XML parsing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::{ParseError, ParseResult};
use super::{NsScope, local_name};
use crate::dav::core::{PropfindRequest, PropfindType, QName};

#[derive(Default)]
struct PropfindState {
    in_propfind: bool,
    in_prop: bool,
    in_include: bool,
    propfind_type: Option<PropfindType>,
    properties: Vec<QName>,
    include: Vec<QName>,
}

impl PropfindState {
    fn open(&mut self, e: &BytesStart<'_>, scope: &NsScope) -> ParseResult<()> {
        match local_name(e)?.as_str() {
            "propfind" => self.in_propfind = true,
            "allprop" if self.in_propfind => {
                self.propfind_type = Some(PropfindType::AllProp {
                    include: Vec::new(),
                });
            }
            "propname" if self.in_propfind => self.propfind_type = Some(PropfindType::PropName),
            "prop" if self.in_propfind && !self.in_prop => {
                self.in_prop = true;
                if self.propfind_type.is_none() {
                    self.propfind_type = Some(PropfindType::Prop(Vec::new()));
                }
            }
            "include" if self.in_propfind => self.in_include = true,
            _ if self.in_prop => self.properties.push(scope.resolve(e)?),
            _ if self.in_include => self.include.push(scope.resolve(e)?),
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        match name {
            "propfind" => self.in_propfind = false,
            "prop" => self.in_prop = false,
            "include" => self.in_include = false,
            _ => {}
        }
    }

    fn finish(self) -> PropfindRequest {
        match self.propfind_type {
            Some(PropfindType::PropName) => PropfindRequest::propname(),
            Some(PropfindType::Prop(_)) => PropfindRequest::prop(self.properties),
            Some(PropfindType::AllProp { .. }) | None => PropfindRequest {
                propfind_type: PropfindType::AllProp {
                    include: self.include,
                },
            },
        }
    }
}

/// Parses a PROPFIND request body.
///
/// ## Summary
/// An empty body is an `allprop` request (RFC 4918 §9.1).
///
/// ## Errors
/// Returns an error if the XML is malformed.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_propfind(xml: &[u8]) -> ParseResult<PropfindRequest> {
    if xml.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!("Empty PROPFIND body, returning allprop");
        return Ok(PropfindRequest::allprop());
    }

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut scope = NsScope::default();
    let mut state = PropfindState::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                scope.enter(e)?;
                state.open(e, &scope)?;
            }
            Ok(Event::Empty(ref e)) => {
                scope.enter(e)?;
                state.open(e, &scope)?;
                state.close(&local_name(e)?);
                scope.leave();
            }
            Ok(Event::End(ref e)) => {
                state.close(std::str::from_utf8(e.local_name().as_ref())?);
                scope.leave();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(state.finish())
}
