//! Translation between [`Contact`] rows and vCards.
//!
//! Outgoing cards are always vCard 4.0. Incoming cards may be 3.0 or 4.0;
//! every property the mapper does not interpret is kept in
//! `Contact::vcard_extra` and replayed on the way out.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use meerkat_db::model::contact::Contact;
use meerkat_rfc::vcard::{VCard, VCardParameter, VCardProperty, VCardVersion, names};
use serde::{Deserialize, Serialize};

use crate::normalize::{
    birthday_to_vcard, gender_from_vcard, gender_to_vcard, non_empty, normalize_birthday,
};
use crate::photo::PhotoSource;
use crate::photo::store::PhotoData;

/// Properties the mapper reads into columns.
const MAPPED: &[&str] = &[
    names::UID,
    names::FN,
    names::N,
    names::NICKNAME,
    names::EMAIL,
    names::TEL,
    names::ADR,
    names::BDAY,
    names::GENDER,
    names::CATEGORIES,
    names::ORG,
    names::PHOTO,
];

/// Properties with one column slot; further occurrences go to the extras.
const SINGLE_SLOT: &[&str] = &[
    names::N,
    names::NICKNAME,
    names::EMAIL,
    names::TEL,
    names::ADR,
    names::BDAY,
    names::GENDER,
    names::ORG,
    names::PHOTO,
];

const FALLBACK_FN: &str = "Unknown";

/// A vCard property stored in `vcard_extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ExtraParam>,
    /// Value as it appeared on the wire.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraParam {
    pub name: String,
    pub values: Vec<String>,
}

/// `vcard_extra` contents: property name to occurrences in document order.
pub type ExtraProperties = BTreeMap<String, Vec<ExtraProperty>>;

impl From<&VCardProperty> for ExtraProperty {
    fn from(prop: &VCardProperty) -> Self {
        Self {
            group: prop.group.clone(),
            params: prop
                .params
                .iter()
                .map(|p| ExtraParam {
                    name: p.name.clone(),
                    values: p.values.clone(),
                })
                .collect(),
            value: prop.raw_value.clone(),
        }
    }
}

impl ExtraProperty {
    fn to_property(&self, name: &str) -> VCardProperty {
        VCardProperty {
            group: self.group.clone(),
            name: name.to_ascii_uppercase(),
            params: self
                .params
                .iter()
                .map(|p| VCardParameter::multi(p.name.clone(), p.values.clone()))
                .collect(),
            raw_value: self.value.clone(),
        }
    }
}

/// Decodes `vcard_extra`; malformed blobs are logged and ignored.
#[must_use]
pub fn read_extras(value: &serde_json::Value) -> ExtraProperties {
    if value.is_null() {
        return ExtraProperties::new();
    }
    serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Ignoring malformed vcard_extra");
        ExtraProperties::new()
    })
}

fn write_extras(extras: &ExtraProperties) -> serde_json::Value {
    serde_json::to_value(extras)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
}

/// ## Summary
/// Renders a contact as a vCard 4.0.
///
/// A missing UID is minted here so the card is always addressable.
#[must_use]
pub fn contact_to_vcard(contact: &Contact, photo: Option<&PhotoData>) -> VCard {
    let mut card = VCard::new(VCardVersion::V4);

    let uid = if contact.vcard_uid.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        contact.vcard_uid.clone()
    };
    card.push(VCardProperty::text(names::UID, &uid));

    let display = contact.display_name();
    let display = if display.is_empty() {
        FALLBACK_FN
    } else {
        display.as_str()
    };
    card.push(VCardProperty::text(names::FN, display));

    card.push(VCardProperty::structured(
        names::N,
        &[
            contact.family_name.as_deref().unwrap_or_default(),
            contact.given_name.as_deref().unwrap_or_default(),
            "",
            "",
            "",
        ],
    ));

    if let Some(nickname) = non_empty(contact.nickname.as_deref()) {
        card.push(VCardProperty::text(names::NICKNAME, &nickname));
    }
    if let Some(email) = non_empty(contact.email.as_deref()) {
        card.push(
            VCardProperty::text(names::EMAIL, &email)
                .with_param(VCardParameter::type_param("INTERNET")),
        );
    }
    if let Some(phone) = non_empty(contact.phone.as_deref()) {
        card.push(
            VCardProperty::text(names::TEL, &phone).with_param(VCardParameter::type_param("CELL")),
        );
    }
    if let Some(address) = non_empty(contact.address.as_deref()) {
        card.push(VCardProperty::structured(
            names::ADR,
            &["", "", &address, "", "", "", ""],
        ));
    }
    if let Some(birthday) = non_empty(contact.birthday.as_deref()) {
        card.push(VCardProperty::raw(names::BDAY, birthday_to_vcard(&birthday)));
    }
    if let Some(gender) = contact.gender {
        card.push(VCardProperty::raw(names::GENDER, gender_to_vcard(gender)));
    }
    if !contact.circles.is_empty() {
        card.push(VCardProperty::list(names::CATEGORIES, &contact.circles));
    }
    if let Some(organization) = non_empty(contact.organization.as_deref()) {
        card.push(VCardProperty::structured(names::ORG, &[&organization]));
    }
    if let Some(photo) = photo {
        card.push(
            VCardProperty::raw(names::PHOTO, photo.base64.clone())
                .with_param(VCardParameter::mediatype(photo.media_type.clone())),
        );
    }

    for (name, occurrences) in read_extras(&contact.vcard_extra) {
        for extra in &occurrences {
            card.push(extra.to_property(&name));
        }
    }

    card
}

/// ## Summary
/// Applies a vCard to `contact`, replacing every mapped column and the
/// extras. The contact's identity (`id`, `owner_id`, `vcard_uid`) and its
/// photo columns are left for the caller.
///
/// Returns where the card's photo comes from, if it carries one.
pub fn vcard_to_contact(card: &VCard, contact: &mut Contact) -> Option<PhotoSource> {
    let mut extras = ExtraProperties::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut photo = None;

    let mut given = None;
    let mut family = None;
    let mut formatted = None;
    let mut structured_name = false;
    let mut email = None;
    let mut phone = None;
    let mut address = None;
    let mut nickname = None;
    let mut birthday = None;
    let mut gender = None;
    let mut organization = None;
    let mut circles = Vec::new();

    for prop in &card.properties {
        let name = prop.name.as_str();
        let Some(&mapped) = MAPPED.iter().find(|m| name.eq_ignore_ascii_case(m)) else {
            keep(&mut extras, prop);
            continue;
        };
        if SINGLE_SLOT.contains(&mapped) && seen.contains(&mapped) {
            keep(&mut extras, prop);
            continue;
        }
        seen.push(mapped);

        match mapped {
            names::N => {
                let components = prop.components();
                family = components.first().and_then(|v| clean(v));
                given = components.get(1).and_then(|v| clean(v));
                structured_name = true;
            }
            names::FN => formatted = clean(&prop.text_value()),
            names::NICKNAME => nickname = clean(&prop.text_value()),
            names::EMAIL => email = clean(&prop.text_value()),
            names::TEL => phone = clean(&prop.text_value()),
            names::ADR => address = join_address(&prop.components()),
            names::BDAY => match normalize_birthday(&prop.text_value()) {
                Some(value) => birthday = Some(value),
                None => keep(&mut extras, prop),
            },
            names::GENDER => match gender_from_vcard(&prop.raw_value) {
                Some(value) => gender = Some(value),
                None => keep(&mut extras, prop),
            },
            names::CATEGORIES => circles.extend(
                prop.list_values()
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            ),
            names::ORG => {
                let parts: Vec<String> = prop
                    .components()
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                organization = (!parts.is_empty()).then(|| parts.join(", "));
            }
            names::PHOTO => photo = photo_source(prop),
            _ => {}
        }
    }

    if !structured_name && let Some(full) = formatted {
        match full.split_once(' ') {
            Some((first, rest)) => {
                given = clean(first);
                family = clean(rest);
            }
            None => given = Some(full),
        }
    }

    contact.given_name = given;
    contact.family_name = family;
    contact.nickname = nickname;
    contact.email = email;
    contact.phone = phone;
    contact.address = address;
    contact.birthday = birthday;
    contact.gender = gender;
    contact.organization = organization;
    contact.circles = circles;
    contact.vcard_extra = write_extras(&extras);

    photo
}

fn clean(value: &str) -> Option<String> {
    non_empty(Some(value))
}

fn keep(extras: &mut ExtraProperties, prop: &VCardProperty) {
    extras
        .entry(prop.name.to_ascii_uppercase())
        .or_default()
        .push(ExtraProperty::from(prop));
}

/// Street, extended, locality, region, postal code, country.
fn join_address(components: &[String]) -> Option<String> {
    let parts: Vec<&str> = [2, 1, 3, 4, 5, 6]
        .iter()
        .filter_map(|&i| components.get(i))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// ## Summary
/// Extracts a photo from a `PHOTO` property: a remote URI, a `data:` URI, or
/// bare base64 as written by vCard 3.0 clients.
///
/// Undecodable payloads are logged and dropped.
#[must_use]
pub fn photo_source(prop: &VCardProperty) -> Option<PhotoSource> {
    let value = prop.text_value();
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(PhotoSource::Remote {
            url: value.to_string(),
        });
    }
    if prop
        .get_param_value("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("uri"))
        && !lower.starts_with("data:")
    {
        return Some(PhotoSource::Remote {
            url: value.to_string(),
        });
    }

    let (payload, uri_media_type) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',')?;
            let media_type = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .map(str::to_ascii_lowercase);
            (body, media_type)
        }
        None => (value, None),
    };

    let bytes = decode_base64(payload)?;
    let media_type = uri_media_type.or_else(|| declared_media_type(prop));
    Some(PhotoSource::Embedded { bytes, media_type })
}

fn declared_media_type(prop: &VCardProperty) -> Option<String> {
    if let Some(media_type) = prop.get_param_value("MEDIATYPE") {
        return Some(media_type.to_ascii_lowercase());
    }
    let kind = prop
        .get_param("TYPE")?
        .values
        .iter()
        .find(|v| !["pref", "work", "home"].iter().any(|t| v.eq_ignore_ascii_case(t)))?;
    let kind = kind.to_ascii_lowercase();
    Some(if kind.contains('/') {
        kind
    } else {
        format!("image/{kind}")
    })
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    match STANDARD.decode(&compact).or_else(|_| URL_SAFE.decode(&compact)) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(error = %err, "Dropping undecodable PHOTO");
            None
        }
    }
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod tests;
