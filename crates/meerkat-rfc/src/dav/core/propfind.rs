//! PROPFIND request types.

use super::namespace::QName;

/// What a PROPFIND asks for (RFC 4918 §9.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropfindType {
    /// Every live property, plus any named in `include`.
    AllProp { include: Vec<QName> },
    /// Property names only.
    PropName,
    /// The listed properties.
    Prop(Vec<QName>),
}

/// A parsed PROPFIND request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropfindRequest {
    pub propfind_type: PropfindType,
}

impl PropfindRequest {
    #[must_use]
    pub fn allprop() -> Self {
        Self {
            propfind_type: PropfindType::AllProp {
                include: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn propname() -> Self {
        Self {
            propfind_type: PropfindType::PropName,
        }
    }

    #[must_use]
    pub fn prop(properties: Vec<QName>) -> Self {
        Self {
            propfind_type: PropfindType::Prop(properties),
        }
    }

    #[must_use]
    pub fn is_allprop(&self) -> bool {
        matches!(self.propfind_type, PropfindType::AllProp { .. })
    }

    #[must_use]
    pub fn is_propname(&self) -> bool {
        matches!(self.propfind_type, PropfindType::PropName)
    }
}
