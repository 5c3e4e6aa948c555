//! DAV property types.

use super::namespace::QName;

/// A DAV property with name and optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavProperty {
    pub name: QName,
    /// `None` renders an empty element (used for 404 propstats and propname).
    pub value: Option<PropertyValue>,
}

/// Values a property may carry in a multistatus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Escaped text content.
    Text(String),
    /// A single `<D:href>` child.
    Href(String),
    /// Several `<D:href>` children.
    HrefSet(Vec<String>),
    /// Empty child elements naming resource types.
    ResourceType(Vec<QName>),
    /// `<D:supported-report>` entries.
    SupportedReports(Vec<QName>),
    /// `<CR:address-data-type>` entries as `(content-type, version)`.
    SupportedAddressData(Vec<(String, String)>),
}

impl DavProperty {
    /// Creates a property with no value.
    #[must_use]
    pub fn empty(name: QName) -> Self {
        Self { name, value: None }
    }

    #[must_use]
    pub fn text(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(PropertyValue::Text(value.into())),
        }
    }

    #[must_use]
    pub fn href(name: QName, href: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(PropertyValue::Href(href.into())),
        }
    }

    #[must_use]
    pub fn href_set(name: QName, hrefs: Vec<String>) -> Self {
        Self {
            name,
            value: Some(PropertyValue::HrefSet(hrefs)),
        }
    }

    #[must_use]
    pub fn resource_type(types: Vec<QName>) -> Self {
        Self {
            name: QName::dav("resourcetype"),
            value: Some(PropertyValue::ResourceType(types)),
        }
    }

    #[must_use]
    pub fn supported_reports(reports: Vec<QName>) -> Self {
        Self {
            name: QName::dav("supported-report-set"),
            value: Some(PropertyValue::SupportedReports(reports)),
        }
    }

    #[must_use]
    pub fn supported_address_data(types: Vec<(String, String)>) -> Self {
        Self {
            name: QName::carddav("supported-address-data"),
            value: Some(PropertyValue::SupportedAddressData(types)),
        }
    }
}
