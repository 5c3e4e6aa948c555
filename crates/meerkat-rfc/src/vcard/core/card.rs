//! The vCard container.

use super::property::{VCardProperty, names};

/// vCard format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VCardVersion {
    /// vCard 3.0 (RFC 2426).
    V3,
    /// vCard 4.0 (RFC 6350).
    V4,
}

impl VCardVersion {
    /// Parses a VERSION value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "3.0" => Some(Self::V3),
            "4.0" => Some(Self::V4),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V3 => "3.0",
            Self::V4 => "4.0",
        }
    }
}

/// A single vCard.
///
/// `VERSION` is held separately; `properties` never contains it and keeps
/// the order in which properties were read or pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct VCard {
    pub version: VCardVersion,
    pub properties: Vec<VCardProperty>,
}

impl VCard {
    #[must_use]
    pub fn new(version: VCardVersion) -> Self {
        Self {
            version,
            properties: Vec::new(),
        }
    }

    pub fn push(&mut self, property: VCardProperty) {
        self.properties.push(property);
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&VCardProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns every property with the given name, in document order.
    pub fn get_properties<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VCardProperty> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns the unescaped UID, if present and non-empty.
    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.get_property(names::UID)
            .map(VCardProperty::text_value)
            .map(|uid| uid.trim().to_string())
            .filter(|uid| !uid.is_empty())
    }
}
