//! XML namespace and qualified name types.

use std::borrow::Cow;

/// `DAV:` namespace URI.
pub const DAV_NS: &str = "DAV:";

/// `CardDAV` namespace URI.
pub const CARDDAV_NS: &str = "urn:ietf:params:xml:ns:carddav";

/// An XML namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(pub Cow<'static, str>);

impl Namespace {
    pub const DAV: Self = Self(Cow::Borrowed(DAV_NS));
    pub const CARDDAV: Self = Self(Cow::Borrowed(CARDDAV_NS));

    #[must_use]
    pub fn new(uri: impl Into<Cow<'static, str>>) -> Self {
        Self(uri.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the prefix used for this namespace in serialized responses.
    #[must_use]
    pub fn default_prefix(&self) -> Option<&'static str> {
        match self.0.as_ref() {
            DAV_NS => Some("D"),
            CARDDAV_NS => Some("CR"),
            _ => None,
        }
    }
}

/// A qualified XML name (namespace + local name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Namespace,
    pub local_name: Cow<'static, str>,
}

impl QName {
    #[must_use]
    pub fn new(namespace: Namespace, local_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace,
            local_name: local_name.into(),
        }
    }

    /// Creates a `DAV:` qualified name.
    #[must_use]
    pub fn dav(local_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::DAV, local_name)
    }

    /// Creates a `CardDAV` qualified name.
    #[must_use]
    pub fn carddav(local_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::CARDDAV, local_name)
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    #[must_use]
    pub fn namespace_uri(&self) -> &str {
        self.namespace.as_str()
    }

    #[must_use]
    pub fn is_dav(&self, local_name: &str) -> bool {
        self.namespace == Namespace::DAV && self.local_name == local_name
    }

    #[must_use]
    pub fn is_carddav(&self, local_name: &str) -> bool {
        self.namespace == Namespace::CARDDAV && self.local_name == local_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_predicates() {
        assert!(QName::dav("getetag").is_dav("getetag"));
        assert!(!QName::dav("getetag").is_carddav("getetag"));
        assert!(QName::carddav("address-data").is_carddav("address-data"));
    }

    #[test]
    fn prefixes() {
        assert_eq!(Namespace::DAV.default_prefix(), Some("D"));
        assert_eq!(Namespace::CARDDAV.default_prefix(), Some("CR"));
        assert_eq!(Namespace::new("urn:x").default_prefix(), None);
    }
}
