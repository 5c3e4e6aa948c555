//! Multistatus XML serialization.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::dav::core::{
    CARDDAV_NS, DAV_NS, DavProperty, Multistatus, PropertyValue, Propstat, PropstatResponse,
    QName,
};

/// Prefix given to properties outside the `DAV:` and `CardDAV` namespaces.
const FOREIGN_PREFIX: &str = "X";

type XmlWriter = Writer<Vec<u8>>;

/// ## Summary
/// Serializes a multistatus body as UTF-8 XML.
///
/// ## Errors
/// Returns an error if writing to the buffer fails or the output is not
/// valid UTF-8.
pub fn serialize_multistatus(multistatus: &Multistatus) -> io::Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("D:multistatus");
    root.push_attribute(("xmlns:D", DAV_NS));
    root.push_attribute(("xmlns:CR", CARDDAV_NS));
    writer.write_event(Event::Start(root))?;

    for response in &multistatus.responses {
        write_response(&mut writer, response)?;
    }

    writer.write_event(Event::End(BytesEnd::new("D:multistatus")))?;

    String::from_utf8(writer.into_inner()).map_err(io::Error::other)
}

fn write_response(writer: &mut XmlWriter, response: &PropstatResponse) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("D:response")))?;
    write_text_element(writer, "D:href", response.href.as_str())?;

    if let Some(status) = response.status {
        write_text_element(writer, "D:status", &status.status_line())?;
    } else {
        for propstat in &response.propstats {
            write_propstat(writer, propstat)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("D:response")))?;
    Ok(())
}

fn write_propstat(writer: &mut XmlWriter, propstat: &Propstat) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("D:propstat")))?;
    writer.write_event(Event::Start(BytesStart::new("D:prop")))?;

    for property in &propstat.properties {
        write_property(writer, property)?;
    }

    writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
    write_text_element(writer, "D:status", &propstat.status.status_line())?;
    writer.write_event(Event::End(BytesEnd::new("D:propstat")))?;
    Ok(())
}

fn write_property(writer: &mut XmlWriter, property: &DavProperty) -> io::Result<()> {
    let name = qualified(&property.name);
    let start = element_start(&property.name, &name);

    let Some(value) = &property.value else {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    };

    writer.write_event(Event::Start(start))?;
    match value {
        PropertyValue::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        PropertyValue::Href(href) => write_text_element(writer, "D:href", href)?,
        PropertyValue::HrefSet(hrefs) => {
            for href in hrefs {
                write_text_element(writer, "D:href", href)?;
            }
        }
        PropertyValue::ResourceType(types) => {
            for kind in types {
                write_empty_qname(writer, kind)?;
            }
        }
        PropertyValue::SupportedReports(reports) => {
            for report in reports {
                writer.write_event(Event::Start(BytesStart::new("D:supported-report")))?;
                writer.write_event(Event::Start(BytesStart::new("D:report")))?;
                write_empty_qname(writer, report)?;
                writer.write_event(Event::End(BytesEnd::new("D:report")))?;
                writer.write_event(Event::End(BytesEnd::new("D:supported-report")))?;
            }
        }
        PropertyValue::SupportedAddressData(types) => {
            for (content_type, version) in types {
                let mut data_type = BytesStart::new("CR:address-data-type");
                data_type.push_attribute(("content-type", content_type.as_str()));
                data_type.push_attribute(("version", version.as_str()));
                writer.write_event(Event::Empty(data_type))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_empty_qname(writer: &mut XmlWriter, qname: &QName) -> io::Result<()> {
    let name = qualified(qname);
    writer.write_event(Event::Empty(element_start(qname, &name)))?;
    Ok(())
}

/// Returns the prefixed element name for a qualified name.
fn qualified(qname: &QName) -> String {
    let prefix = qname
        .namespace
        .default_prefix()
        .unwrap_or(FOREIGN_PREFIX);
    format!("{prefix}:{}", qname.local_name())
}

/// Opens an element, declaring the foreign namespace inline when needed.
fn element_start<'a>(qname: &QName, name: &'a str) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    if qname.namespace.default_prefix().is_none() {
        start.push_attribute(("xmlns:X", qname.namespace_uri()));
    }
    start
}
