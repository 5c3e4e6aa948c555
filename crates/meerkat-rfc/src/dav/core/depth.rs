//! Depth header values.

/// `WebDAV` Depth header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// The resource itself only.
    #[default]
    Zero,
    /// The resource and its immediate children.
    One,
    /// The resource and all descendants.
    Infinity,
}

impl Depth {
    /// Parses from header value.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" => Some(Self::Zero),
            "1" => Some(Self::One),
            "infinity" => Some(Self::Infinity),
            _ => None,
        }
    }

    /// Whether children of a collection should be listed.
    #[must_use]
    pub const fn includes_children(self) -> bool {
        !matches!(self, Self::Zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_values() {
        assert_eq!(Depth::from_header("0"), Some(Depth::Zero));
        assert_eq!(Depth::from_header(" 1 "), Some(Depth::One));
        assert_eq!(Depth::from_header("Infinity"), Some(Depth::Infinity));
        assert_eq!(Depth::from_header("2"), None);
        assert!(Depth::Infinity.includes_children());
        assert!(!Depth::default().includes_children());
    }
}
