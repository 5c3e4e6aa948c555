//! DAV request body parsing.

mod error;
mod propfind;
mod report;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use propfind::parse_propfind;
pub use report::parse_report;

use quick_xml::events::BytesStart;

use crate::dav::core::{DAV_NS, Namespace, QName};

/// In-scope `xmlns` declarations as `(prefix, uri)`; the default namespace
/// has an empty prefix. Declarations are dropped when their element closes.
#[derive(Debug, Default)]
struct NsScope {
    decls: Vec<(String, String)>,
    marks: Vec<usize>,
}

impl NsScope {
    /// Opens an element, recording the declarations it carries.
    fn enter(&mut self, e: &BytesStart<'_>) -> ParseResult<()> {
        self.marks.push(self.decls.len());
        for attr in e.attributes().flatten() {
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.decls.push((prefix.to_string(), value.to_string()));
            } else if key == "xmlns" {
                self.decls.push((String::new(), value.to_string()));
            }
        }
        Ok(())
    }

    /// Closes the innermost open element.
    fn leave(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.decls.truncate(mark);
        }
    }

    /// Resolves an element name. Unprefixed names with no default namespace
    /// fall back to `DAV:`.
    fn resolve(&self, e: &BytesStart<'_>) -> ParseResult<QName> {
        let name_bytes = e.name();
        let name = std::str::from_utf8(name_bytes.as_ref())?;

        let (prefix, local_name) = name.split_once(':').unwrap_or(("", name));

        let namespace = self
            .decls
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map_or(DAV_NS, |(_, ns)| ns.as_str());

        Ok(QName::new(
            Namespace::new(namespace.to_string()),
            local_name.to_string(),
        ))
    }
}

fn local_name(e: &BytesStart<'_>) -> ParseResult<String> {
    Ok(std::str::from_utf8(e.local_name().as_ref())?.to_owned())
}

fn get_attribute(e: &BytesStart<'_>, name: &str) -> ParseResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if std::str::from_utf8(attr.key.as_ref())? == name {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_owned()));
        }
    }
    Ok(None)
}
