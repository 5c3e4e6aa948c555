//! DAV href values.

/// An href as carried in DAV XML: an absolute URL or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href(pub String);

impl Href {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path component, dropping scheme and authority if present.
    #[must_use]
    pub fn path(&self) -> &str {
        let value = self.0.trim();
        let Some((_, rest)) = value.split_once("://") else {
            return value;
        };
        rest.find('/').map_or("/", |idx| &rest[idx..])
    }

    /// Returns the final non-empty path segment.
    #[must_use]
    pub fn last_segment(&self) -> Option<&str> {
        self.path().rsplit('/').find(|segment| !segment.is_empty())
    }
}

impl From<String> for Href {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Href {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_of_absolute_url() {
        let href = Href::new("https://dav.example.com/carddav/addressbooks/a/contacts/x.vcf");
        assert_eq!(href.path(), "/carddav/addressbooks/a/contacts/x.vcf");
        assert_eq!(href.last_segment(), Some("x.vcf"));
    }

    #[test]
    fn path_of_relative_href() {
        let href = Href::new("/carddav/addressbooks/a/contacts/");
        assert_eq!(href.path(), "/carddav/addressbooks/a/contacts/");
        assert_eq!(href.last_segment(), Some("contacts"));
        assert_eq!(Href::new("http://host").path(), "/");
    }
}
