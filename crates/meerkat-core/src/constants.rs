/// Route component constants shared across crates
pub const CARDDAV_ROUTE_COMPONENT: &str = "carddav";
pub const CARDDAV_ROUTE_PREFIX: &str = const_str::concat!("/", CARDDAV_ROUTE_COMPONENT);
/// Where discovery lands; the root collection of the `CardDAV` namespace.
pub const CARDDAV_ROOT_PATH: &str = const_str::concat!(CARDDAV_ROUTE_PREFIX, "/");

pub const PRINCIPALS_COMPONENT: &str = "principals";
pub const ADDRESSBOOKS_COMPONENT: &str = "addressbooks";

/// The single address book every user owns.
pub const ADDRESSBOOK_SLUG: &str = "contacts";
pub const ADDRESSBOOK_DISPLAY_NAME: &str = "Contacts";

pub const VCARD_EXTENSION: &str = ".vcf";
pub const VCARD_CONTENT_TYPE: &str = "text/vcard; charset=utf-8";

pub const WELL_KNOWN_CARDDAV: &str = "/.well-known/carddav";

pub const IMPORT_ROUTE_COMPONENT: &str = "import";
pub const IMPORT_ROUTE_PREFIX: &str = const_str::concat!("/", IMPORT_ROUTE_COMPONENT);

pub const AUTH_REALM: &str = "Meerkat";
pub const BASIC_AUTH_CHALLENGE: &str =
    const_str::concat!("Basic realm=\"", AUTH_REALM, "\", charset=\"UTF-8\"");

/// ## Summary
/// Path of a user's principal resource.
#[must_use]
pub fn principal_path(username: &str) -> String {
    format!("{CARDDAV_ROUTE_PREFIX}/{PRINCIPALS_COMPONENT}/{username}/")
}

/// ## Summary
/// Path of a user's address-book home set.
#[must_use]
pub fn addressbook_home_path(username: &str) -> String {
    format!("{CARDDAV_ROUTE_PREFIX}/{ADDRESSBOOKS_COMPONENT}/{username}/")
}

/// ## Summary
/// Path of a user's single address book collection.
#[must_use]
pub fn addressbook_path(username: &str) -> String {
    format!("{}{ADDRESSBOOK_SLUG}/", addressbook_home_path(username))
}

/// ## Summary
/// Path of one address object, addressed by its vCard UID.
#[must_use]
pub fn address_object_path(username: &str, uid: &str) -> String {
    format!("{}{uid}{VCARD_EXTENSION}", addressbook_path(username))
}
