//! Address object operations behind the `CardDAV` handlers.
//!
//! Every operation is scoped to the authenticated user; objects are addressed
//! by `{uid}.vcf` inside the user's single address book. Purely numeric names
//! are also accepted and resolved as contact ids for clients that still hold
//! pre-UID hrefs; outgoing hrefs always use the UID.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use meerkat_core::constants::{VCARD_EXTENSION, address_object_path, addressbook_path};
use meerkat_db::db::store::{ContactStore, PutConditions};
use meerkat_db::error::DbError;
use meerkat_db::model::contact::Contact;
use meerkat_db::model::user::User;
use meerkat_rfc::dav::{AddressbookQuery, Href};
use meerkat_rfc::filter;
use meerkat_rfc::vcard::{VCard, parse_single, serialize_single};

use super::mapper::{contact_to_vcard, vcard_to_contact};
use crate::error::{ServiceError, ServiceResult};
use crate::photo::Photos;

/// A contact rendered as a `CardDAV` resource.
#[derive(Debug, Clone)]
pub struct AddressObject {
    pub contact: Contact,
    pub href: String,
    /// Unquoted entity tag.
    pub etag: String,
    pub card: VCard,
    /// The serialized card, as returned by GET.
    pub data: String,
    pub last_modified: DateTime<Utc>,
}

impl AddressObject {
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.data.len()
    }
}

/// Result of a PUT operation on an address object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectResult {
    /// `ETag` of the created or updated object.
    pub etag: String,
    /// Whether the object was newly created (true) or updated (false).
    pub created: bool,
    pub href: String,
}

#[derive(Clone)]
pub struct CardDavService {
    store: Arc<dyn ContactStore>,
    photos: Photos,
}

impl CardDavService {
    #[must_use]
    pub fn new(store: Arc<dyn ContactStore>, photos: Photos) -> Self {
        Self { store, photos }
    }

    /// ## Summary
    /// Renders every live contact of `user`.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    #[tracing::instrument(skip_all, fields(user_id = user.id))]
    pub async fn list_objects(&self, user: &User) -> ServiceResult<Vec<AddressObject>> {
        let contacts = self.store.list_contacts(user.id).await?;
        let mut objects = Vec::with_capacity(contacts.len());
        for contact in contacts {
            objects.push(self.render(user, contact).await);
        }
        tracing::debug!(count = objects.len(), "Listed address objects");
        Ok(objects)
    }

    /// ## Summary
    /// Fetches one object by its resource name (`{uid}.vcf`).
    ///
    /// ## Errors
    /// Returns [`ServiceError::NotFound`] if no live contact matches.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn get_object(
        &self,
        user: &User,
        resource_name: &str,
    ) -> ServiceResult<AddressObject> {
        let contact = self
            .resolve(user.id, resource_name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(resource_name.to_string()))?;
        Ok(self.render(user, contact).await)
    }

    /// ## Summary
    /// Creates or replaces the object at `resource_name` from a vCard body.
    ///
    /// Photo failures are logged; the contact is still written and keeps the
    /// photo it had before.
    ///
    /// ## Errors
    /// Returns [`ServiceError::InvalidInput`] for bodies that are not a
    /// single vCard, and [`ServiceError::PreconditionFailed`] when
    /// `If-Match`/`If-None-Match` do not hold.
    #[tracing::instrument(
        skip(self, user, body, conditions),
        fields(user_id = user.id, len = body.len())
    )]
    pub async fn put_object(
        &self,
        user: &User,
        resource_name: &str,
        body: &[u8],
        conditions: PutConditions,
    ) -> ServiceResult<PutObjectResult> {
        let text = std::str::from_utf8(body)
            .map_err(|e| ServiceError::InvalidInput(format!("vCard is not UTF-8: {e}")))?;
        let card = parse_single(text)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid vCard: {e}")))?;

        let existing = self.resolve(user.id, resource_name).await?;
        conditions.check(existing.as_ref())?;

        let mut contact = match existing {
            Some(contact) => contact,
            None => {
                let uid = Some(object_uid(resource_name))
                    .filter(|uid| !uid.is_empty())
                    .map(ToString::to_string)
                    .or_else(|| card.uid())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                Contact::new(user.id, uid)
            }
        };

        match vcard_to_contact(&card, &mut contact) {
            Some(source) => match self.photos.materialize(source).await {
                Ok(saved) => {
                    contact.photo = Some(saved.filename);
                    contact.photo_thumbnail = Some(saved.thumbnail);
                }
                Err(err) => {
                    tracing::warn!(error = %err, uid = %contact.vcard_uid, "Keeping previous photo");
                }
            },
            None => {
                contact.photo = None;
                contact.photo_thumbnail = None;
            }
        }

        let outcome = self.store.put_contact(user.id, contact, conditions).await?;
        let created = outcome.is_created();
        let contact = outcome.into_contact();
        tracing::info!(uid = %contact.vcard_uid, created, "Stored address object");

        Ok(PutObjectResult {
            etag: contact.etag,
            created,
            href: address_object_path(&user.username, &contact.vcard_uid),
        })
    }

    /// ## Summary
    /// Soft-deletes the object at `resource_name`.
    ///
    /// ## Errors
    /// Returns [`ServiceError::NotFound`] if it does not exist and
    /// [`ServiceError::PreconditionFailed`] if `if_match` is stale.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete_object(
        &self,
        user: &User,
        resource_name: &str,
        if_match: Option<&str>,
    ) -> ServiceResult<()> {
        let contact = self
            .resolve(user.id, resource_name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(resource_name.to_string()))?;

        match self
            .store
            .soft_delete(user.id, &contact.vcard_uid, if_match)
            .await
        {
            Ok(()) => {
                tracing::info!(uid = %contact.vcard_uid, "Deleted address object");
                Ok(())
            }
            Err(DbError::NotFound) => Err(ServiceError::NotFound(resource_name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// ## Summary
    /// Runs an `addressbook-query` over the listed objects.
    ///
    /// ## Errors
    /// Returns [`ServiceError::Forbidden`] for an unsupported collation.
    #[tracing::instrument(skip_all, fields(user_id = user.id))]
    pub async fn query(
        &self,
        user: &User,
        query: &AddressbookQuery,
    ) -> ServiceResult<Vec<AddressObject>> {
        let objects = self.list_objects(user).await?;
        let Some(filter) = &query.filter else {
            return Ok(limit(objects, query.limit));
        };

        let mut matched = Vec::new();
        for object in objects {
            let keep = filter::matches(&object.card, filter)
                .map_err(|e| ServiceError::Forbidden(e.to_string()))?;
            if keep {
                matched.push(object);
            }
        }
        Ok(limit(matched, query.limit))
    }

    /// ## Summary
    /// Resolves each href of an `addressbook-multiget`. Hrefs outside the
    /// user's address book, or naming no live contact, come back as `None`.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    #[tracing::instrument(skip_all, fields(user_id = user.id, count = hrefs.len()))]
    pub async fn multiget(
        &self,
        user: &User,
        hrefs: &[Href],
    ) -> ServiceResult<Vec<(Href, Option<AddressObject>)>> {
        let collection = addressbook_path(&user.username);
        let mut results = Vec::with_capacity(hrefs.len());

        for href in hrefs {
            let name = href
                .path()
                .strip_prefix(collection.as_str())
                .filter(|rest| !rest.is_empty() && !rest.contains('/'));
            let object = match name {
                Some(name) => match self.resolve(user.id, name).await? {
                    Some(contact) => Some(self.render(user, contact).await),
                    None => None,
                },
                None => None,
            };
            results.push((href.clone(), object));
        }
        Ok(results)
    }

    async fn resolve(&self, owner_id: i64, resource_name: &str) -> ServiceResult<Option<Contact>> {
        let uid = object_uid(resource_name);
        if uid.is_empty() {
            return Ok(None);
        }
        if let Some(contact) = self.store.find_by_uid(owner_id, uid).await? {
            return Ok(Some(contact));
        }
        match uid.parse::<i64>() {
            Ok(id) if id > 0 => {
                let found = self.store.find_by_id(owner_id, id).await?;
                if found.is_some() {
                    tracing::debug!(id, "Resolved legacy numeric object name");
                }
                Ok(found)
            }
            _ => Ok(None),
        }
    }

    async fn render(&self, user: &User, contact: Contact) -> AddressObject {
        let photo = self.photos.store.load(&contact).await;
        let card = contact_to_vcard(&contact, photo.as_ref());
        let data = serialize_single(&card);
        AddressObject {
            href: address_object_path(&user.username, &contact.vcard_uid),
            etag: contact.etag.clone(),
            last_modified: contact.updated_at,
            card,
            data,
            contact,
        }
    }
}

/// Strips the `.vcf` extension from a resource name.
#[must_use]
pub fn object_uid(resource_name: &str) -> &str {
    let name = resource_name.trim();
    name.strip_suffix(VCARD_EXTENSION).unwrap_or(name)
}

fn limit(mut objects: Vec<AddressObject>, limit: Option<u32>) -> Vec<AddressObject> {
    if let Some(max) = limit.and_then(|n| usize::try_from(n).ok()) {
        objects.truncate(max);
    }
    objects
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
