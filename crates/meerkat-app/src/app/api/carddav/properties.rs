//! WebDAV properties of the resources in a user's `CardDAV` namespace.

use meerkat_core::constants::{
    ADDRESSBOOK_DISPLAY_NAME, CARDDAV_ROOT_PATH, VCARD_CONTENT_TYPE, addressbook_home_path,
    addressbook_path, principal_path,
};
use meerkat_db::model::user::User;
use meerkat_rfc::dav::{DavProperty, PropfindType, PropstatResponse, QName};
use meerkat_service::carddav::service::AddressObject;

use super::util::{http_date, quote_etag};

/// A resource a PROPFIND or REPORT response describes.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Root,
    Principal,
    Home,
    Collection,
    Object(&'a AddressObject),
}

impl Resource<'_> {
    #[must_use]
    pub fn href(&self, user: &User) -> String {
        match self {
            Self::Root => CARDDAV_ROOT_PATH.to_string(),
            Self::Principal => principal_path(&user.username),
            Self::Home => addressbook_home_path(&user.username),
            Self::Collection => addressbook_path(&user.username),
            Self::Object(object) => object.href.clone(),
        }
    }

    /// Properties returned for `allprop`. `address-data` is left out; it
    /// must be asked for by name.
    fn live_properties(&self, user: &User) -> Vec<DavProperty> {
        let mut props = vec![DavProperty::href(
            QName::dav("current-user-principal"),
            principal_path(&user.username),
        )];

        match self {
            Self::Root => {
                props.push(DavProperty::resource_type(vec![QName::dav("collection")]));
            }
            Self::Principal => {
                props.push(DavProperty::resource_type(vec![
                    QName::dav("collection"),
                    QName::dav("principal"),
                ]));
                props.push(DavProperty::text(QName::dav("displayname"), &user.username));
                props.push(DavProperty::href(
                    QName::dav("principal-URL"),
                    principal_path(&user.username),
                ));
                props.push(DavProperty::href(
                    QName::carddav("addressbook-home-set"),
                    addressbook_home_path(&user.username),
                ));
            }
            Self::Home => {
                props.push(DavProperty::resource_type(vec![QName::dav("collection")]));
                props.push(DavProperty::text(QName::dav("displayname"), &user.username));
            }
            Self::Collection => {
                props.push(DavProperty::resource_type(vec![
                    QName::dav("collection"),
                    QName::carddav("addressbook"),
                ]));
                props.push(DavProperty::text(
                    QName::dav("displayname"),
                    ADDRESSBOOK_DISPLAY_NAME,
                ));
                props.push(DavProperty::supported_address_data(vec![
                    ("text/vcard".to_string(), "3.0".to_string()),
                    ("text/vcard".to_string(), "4.0".to_string()),
                ]));
                props.push(DavProperty::supported_reports(vec![
                    QName::carddav("addressbook-query"),
                    QName::carddav("addressbook-multiget"),
                ]));
            }
            Self::Object(object) => {
                props.push(DavProperty::resource_type(Vec::new()));
                props.push(DavProperty::text(
                    QName::dav("getetag"),
                    quote_etag(&object.etag),
                ));
                props.push(DavProperty::text(
                    QName::dav("getcontenttype"),
                    VCARD_CONTENT_TYPE,
                ));
                props.push(DavProperty::text(
                    QName::dav("getcontentlength"),
                    object.content_length().to_string(),
                ));
                props.push(DavProperty::text(
                    QName::dav("getlastmodified"),
                    http_date(object.last_modified),
                ));
            }
        }
        props
    }

    fn address_data(&self) -> Option<DavProperty> {
        match self {
            Self::Object(object) => Some(DavProperty::text(
                QName::carddav("address-data"),
                object.data.clone(),
            )),
            _ => None,
        }
    }

    /// ## Summary
    /// The response element for a PROPFIND of this resource.
    #[must_use]
    pub fn propfind_response(&self, user: &User, request: &PropfindType) -> PropstatResponse {
        match request {
            PropfindType::AllProp { include } => {
                let mut found = self.live_properties(user);
                if include.iter().any(|name| name.is_carddav("address-data")) {
                    found.extend(self.address_data());
                }
                PropstatResponse::with_found_and_not_found(self.href(user), found, Vec::new())
            }
            PropfindType::PropName => {
                let names = self
                    .live_properties(user)
                    .into_iter()
                    .chain(self.address_data())
                    .map(|prop| DavProperty::empty(prop.name))
                    .collect();
                PropstatResponse::with_found_and_not_found(self.href(user), names, Vec::new())
            }
            PropfindType::Prop(names) => self.selected(user, names),
        }
    }

    /// ## Summary
    /// The response element holding exactly the named properties; names the
    /// resource does not have go into a 404 propstat.
    #[must_use]
    pub fn selected(&self, user: &User, names: &[QName]) -> PropstatResponse {
        let available: Vec<DavProperty> = self
            .live_properties(user)
            .into_iter()
            .chain(self.address_data())
            .collect();

        let mut found = Vec::new();
        let mut not_found = Vec::new();
        for name in names {
            match available.iter().find(|prop| prop.name == *name) {
                Some(prop) => found.push(prop.clone()),
                None => not_found.push(DavProperty::empty(name.clone())),
            }
        }
        PropstatResponse::with_found_and_not_found(self.href(user), found, not_found)
    }
}
