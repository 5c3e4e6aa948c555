//! vCard property type (RFC 6350 §3.3).

use super::parameter::VCardParameter;
use crate::vcard::build::escape::{escape_component, escape_text};
use crate::vcard::parse::values::{split_component, split_structured, unescape_text};

/// A vCard property.
///
/// The value is stored as it appears in the content line after unfolding.
/// Escapes are resolved only by the typed accessors so properties that are
/// never interpreted serialize back to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VCardProperty {
    /// Optional property group (e.g., "item1" in "item1.TEL").
    pub group: Option<String>,
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<VCardParameter>,
    /// Value as written on the wire.
    pub raw_value: String,
}

impl VCardProperty {
    /// Creates a property from an already-escaped value.
    #[must_use]
    pub fn raw(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            raw_value: raw_value.into(),
        }
    }

    /// Creates a property with an escaped text value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: &str) -> Self {
        Self::raw(name, escape_text(value))
    }

    /// Creates a structured property (`N`, `ADR`, `ORG`); one entry per
    /// `;`-separated component.
    #[must_use]
    pub fn structured(name: impl Into<String>, components: &[&str]) -> Self {
        let raw = components
            .iter()
            .map(|c| escape_component(c))
            .collect::<Vec<_>>()
            .join(";");
        Self::raw(name, raw)
    }

    /// Creates a comma-separated list property (`CATEGORIES`, `NICKNAME`).
    #[must_use]
    pub fn list(name: impl Into<String>, values: &[String]) -> Self {
        let raw = values
            .iter()
            .map(|v| escape_component(v))
            .collect::<Vec<_>>()
            .join(",");
        Self::raw(name, raw)
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with_param(mut self, param: VCardParameter) -> Self {
        self.params.push(param);
        self
    }

    /// Returns the parameter with the given name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&VCardParameter> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns the first value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Returns whether this property has the specified TYPE value.
    #[must_use]
    pub fn has_type(&self, type_value: &str) -> bool {
        self.get_param("TYPE")
            .is_some_and(|p| p.has_value(type_value))
    }

    /// The value with text escapes resolved.
    #[must_use]
    pub fn text_value(&self) -> String {
        unescape_text(&self.raw_value)
    }

    /// The `;`-separated components with escapes resolved.
    #[must_use]
    pub fn components(&self) -> Vec<String> {
        split_structured(&self.raw_value)
            .into_iter()
            .map(unescape_text)
            .collect()
    }

    /// The `,`-separated values with escapes resolved.
    #[must_use]
    pub fn list_values(&self) -> Vec<String> {
        split_component(&self.raw_value)
    }
}

/// Property names the crate refers to.
pub mod names {
    pub const FN: &str = "FN";
    pub const N: &str = "N";
    pub const NICKNAME: &str = "NICKNAME";
    pub const PHOTO: &str = "PHOTO";
    pub const BDAY: &str = "BDAY";
    pub const GENDER: &str = "GENDER";
    pub const ADR: &str = "ADR";
    pub const TEL: &str = "TEL";
    pub const EMAIL: &str = "EMAIL";
    pub const ORG: &str = "ORG";
    pub const CATEGORIES: &str = "CATEGORIES";
    pub const UID: &str = "UID";
    pub const BEGIN: &str = "BEGIN";
    pub const END: &str = "END";
    pub const VERSION: &str = "VERSION";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trips_through_escaping() {
        let prop = VCardProperty::text("NOTE", "a,b;c\nd");
        assert_eq!(prop.raw_value, "a\\,b\\;c\\nd");
        assert_eq!(prop.text_value(), "a,b;c\nd");
    }

    #[test]
    fn structured_components() {
        let prop = VCardProperty::structured("N", &["Doe", "Jane", "", "", ""]);
        assert_eq!(prop.raw_value, "Doe;Jane;;;");
        assert_eq!(prop.components(), vec!["Doe", "Jane", "", "", ""]);
    }

    #[test]
    fn list_values_split_on_unescaped_commas() {
        let prop = VCardProperty::raw("CATEGORIES", "work,a\\,b");
        assert_eq!(prop.list_values(), vec!["work", "a,b"]);
    }

    #[test]
    fn type_lookup_is_case_insensitive() {
        let prop = VCardProperty::text("TEL", "+1 555").with_param(VCardParameter::multi(
            "type",
            vec!["home".into(), "voice".into()],
        ));
        assert!(prop.has_type("HOME"));
        assert!(!prop.has_type("cell"));
    }
}
