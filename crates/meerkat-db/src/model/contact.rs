use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::{Deserialize, Serialize};

use crate::db::enums::Gender;
use crate::db::schema;

/// A contact row.
///
/// `id == 0` marks a contact that has not been persisted yet (the mapper
/// and the import pipeline build these before handing them to the store).
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::contacts)]
#[diesel(check_for_backend(Pg))]
pub struct Contact {
    pub id: i64,
    pub owner_id: i64,
    pub vcard_uid: String,
    pub etag: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub nickname: Option<String>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD` or `--MM-DD`.
    pub birthday: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
    pub circles: Vec<String>,
    /// File name inside the photo directory.
    pub photo: Option<String>,
    /// `data:image/jpeg;base64,...`
    pub photo_thumbnail: Option<String>,
    /// Unmapped vCard properties keyed by property name.
    pub vcard_extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    /// Creates an unsaved, empty contact.
    #[must_use]
    pub fn new(owner_id: i64, vcard_uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner_id,
            vcard_uid: vcard_uid.into(),
            etag: String::new(),
            given_name: None,
            family_name: None,
            nickname: None,
            gender: None,
            email: None,
            phone: None,
            birthday: None,
            address: None,
            organization: None,
            circles: Vec::new(),
            photo: None,
            photo_thumbnail: None,
            vcard_extra: serde_json::Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// "{given} {family}" trimmed, falling back to the nickname.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        if full.is_empty() {
            self.nickname.clone().unwrap_or_default()
        } else {
            full.to_string()
        }
    }
}

/// Drops blank and case-insensitively repeated circles, keeping the first
/// spelling seen.
#[must_use]
pub fn dedup_circles(circles: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(circles.len());
    let mut result = Vec::with_capacity(circles.len());
    for circle in circles {
        let trimmed = circle.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(trimmed.to_string());
        }
    }
    result
}

/// Column values written on insert and update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::contacts)]
#[diesel(treat_none_as_null = true)]
pub struct ContactWrite<'a> {
    pub owner_id: i64,
    pub vcard_uid: &'a str,
    pub etag: &'a str,
    pub given_name: Option<&'a str>,
    pub family_name: Option<&'a str>,
    pub nickname: Option<&'a str>,
    pub gender: Option<Gender>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub birthday: Option<&'a str>,
    pub address: Option<&'a str>,
    pub organization: Option<&'a str>,
    pub circles: &'a [String],
    pub photo: Option<&'a str>,
    pub photo_thumbnail: Option<&'a str>,
    pub vcard_extra: &'a serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl<'a> ContactWrite<'a> {
    /// Borrows the writable columns of `contact`, stamping a new `etag`.
    #[must_use]
    pub fn new(contact: &'a Contact, etag: &'a str) -> Self {
        Self {
            owner_id: contact.owner_id,
            vcard_uid: &contact.vcard_uid,
            etag,
            given_name: contact.given_name.as_deref(),
            family_name: contact.family_name.as_deref(),
            nickname: contact.nickname.as_deref(),
            gender: contact.gender,
            email: contact.email.as_deref(),
            phone: contact.phone.as_deref(),
            birthday: contact.birthday.as_deref(),
            address: contact.address.as_deref(),
            organization: contact.organization.as_deref(),
            circles: &contact.circles,
            photo: contact.photo.as_deref(),
            photo_thumbnail: contact.photo_thumbnail.as_deref(),
            vcard_extra: &contact.vcard_extra,
            updated_at: Utc::now(),
        }
    }
}
