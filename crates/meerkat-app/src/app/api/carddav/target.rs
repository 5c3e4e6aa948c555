//! What a `CardDAV` request path points at.

use meerkat_core::constants::{
    ADDRESSBOOK_SLUG, ADDRESSBOOKS_COMPONENT, CARDDAV_ROOT_PATH, CARDDAV_ROUTE_PREFIX,
    PRINCIPALS_COMPONENT, address_object_path, addressbook_home_path, addressbook_path,
    principal_path,
};

/// A resource in the `CardDAV` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DavTarget {
    /// `/carddav/`, where clients start principal discovery.
    Root,
    Principal { username: String },
    Home { username: String },
    Collection { username: String },
    Object { username: String, name: String },
}

impl DavTarget {
    /// ## Summary
    /// Resolves a request path. Returns `None` for paths outside the layout.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(CARDDAV_ROUTE_PREFIX)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        let target = match segments.as_slice() {
            [] => Self::Root,
            [PRINCIPALS_COMPONENT, user] => Self::Principal {
                username: (*user).to_string(),
            },
            [ADDRESSBOOKS_COMPONENT, user] => Self::Home {
                username: (*user).to_string(),
            },
            [ADDRESSBOOKS_COMPONENT, user, ADDRESSBOOK_SLUG] => Self::Collection {
                username: (*user).to_string(),
            },
            [ADDRESSBOOKS_COMPONENT, user, ADDRESSBOOK_SLUG, name] => Self::Object {
                username: (*user).to_string(),
                name: (*name).to_string(),
            },
            _ => return None,
        };
        Some(target)
    }

    /// The user whose namespace this is; `None` for the root.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Principal { username }
            | Self::Home { username }
            | Self::Collection { username }
            | Self::Object { username, .. } => Some(username),
        }
    }

    /// Canonical href of the target.
    #[must_use]
    pub fn href(&self) -> String {
        match self {
            Self::Root => CARDDAV_ROOT_PATH.to_string(),
            Self::Principal { username } => principal_path(username),
            Self::Home { username } => addressbook_home_path(username),
            Self::Collection { username } => addressbook_path(username),
            Self::Object { username, name } => {
                let uid = meerkat_service::carddav::service::object_uid(name);
                address_object_path(username, uid)
            }
        }
    }
}
