//! The persistence seam used by the service layer.
//!
//! Both backends ([`crate::db::pg::PgContactStore`] and
//! [`crate::db::memory::MemoryContactStore`]) implement the same contract:
//! reads only ever return live (not soft-deleted) contacts, every persisted
//! write stamps a fresh `etag`, and precondition checks happen atomically with
//! the write they guard.

use futures::future::BoxFuture;

use crate::error::{DbError, DbResult};
use crate::model::contact::{Contact, dedup_circles};
use crate::model::note::{NewNote, Note};
use crate::model::user::User;

/// HTTP-style write preconditions, with `etag` values unquoted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutConditions {
    /// `If-Match`; `*` matches any existing contact.
    pub if_match: Option<String>,
    /// `If-None-Match` tags; `*` matches any existing contact.
    pub if_none_match: Vec<String>,
}

impl PutConditions {
    /// ## Summary
    /// Evaluates the preconditions against the current live row.
    ///
    /// ## Errors
    /// Returns [`DbError::PreconditionFailed`] when the write must not proceed.
    pub fn check(&self, existing: Option<&Contact>) -> DbResult<()> {
        if let Some(current) = existing
            && self
                .if_none_match
                .iter()
                .any(|tag| tag == "*" || *tag == current.etag)
        {
            return Err(DbError::PreconditionFailed("resource already exists"));
        }
        if let Some(expected) = &self.if_match {
            let Some(current) = existing else {
                return Err(DbError::PreconditionFailed("resource does not exist"));
            };
            if expected != "*" && *expected != current.etag {
                return Err(DbError::PreconditionFailed("etag mismatch"));
            }
        }
        Ok(())
    }
}

/// Result of a conditional put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Created(Contact),
    Updated(Contact),
}

impl PutOutcome {
    #[must_use]
    pub fn contact(&self) -> &Contact {
        match self {
            Self::Created(contact) | Self::Updated(contact) => contact,
        }
    }

    #[must_use]
    pub fn into_contact(self) -> Contact {
        match self {
            Self::Created(contact) | Self::Updated(contact) => contact,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Generates an opaque, strong entity tag.
#[must_use]
pub fn new_etag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Normalizes a contact before it is written.
pub(crate) fn prepare_write(contact: &mut Contact) {
    contact.circles = dedup_circles(&contact.circles);
}

/// Escapes `%`, `_` and `\` for use in a `LIKE`/`ILIKE` pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Store for users, contacts and notes.
pub trait ContactStore: Send + Sync {
    /// Looks a user up by username or (case-insensitive) email.
    fn find_user_by_login<'a>(&'a self, login: &'a str) -> BoxFuture<'a, DbResult<Option<User>>>;

    fn find_user_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<User>>>;

    fn create_user<'a>(
        &'a self,
        username: &'a str,
        email: &'a str,
        password_hash: &'a str,
    ) -> BoxFuture<'a, DbResult<User>>;

    /// Live contacts of an owner, ordered by id.
    fn list_contacts(&self, owner_id: i64) -> BoxFuture<'_, DbResult<Vec<Contact>>>;

    fn find_by_uid<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>>;

    fn find_by_id(&self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>>;

    /// Case-insensitive equality on email.
    fn find_by_email<'a>(
        &'a self,
        owner_id: i64,
        email: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>>;

    /// Case-insensitive equality on both given and family name.
    fn find_by_name<'a>(
        &'a self,
        owner_id: i64,
        given_name: &'a str,
        family_name: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>>;

    /// Creates or replaces the contact keyed by `(owner_id, vcard_uid)`.
    ///
    /// The preconditions are evaluated under the same lock as the write.
    fn put_contact(
        &self,
        owner_id: i64,
        contact: Contact,
        conditions: PutConditions,
    ) -> BoxFuture<'_, DbResult<PutOutcome>>;

    /// Marks the live contact with `uid` as deleted.
    fn soft_delete<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
        if_match: Option<&'a str>,
    ) -> BoxFuture<'a, DbResult<()>>;

    /// Replaces only the photo columns (and the `etag`).
    fn patch_photo(
        &self,
        owner_id: i64,
        contact_id: i64,
        photo: Option<String>,
        photo_thumbnail: Option<String>,
    ) -> BoxFuture<'_, DbResult<Contact>>;

    fn list_notes(&self, owner_id: i64, contact_id: i64) -> BoxFuture<'_, DbResult<Vec<Note>>>;

    /// Opens a transaction. The caller must finish it with
    /// [`ContactTx::commit`] or [`ContactTx::rollback`].
    fn begin(&self) -> BoxFuture<'_, DbResult<Box<dyn ContactTx>>>;
}

/// Writes grouped into one database transaction.
///
/// A failing statement only undoes itself; the transaction stays usable so
/// callers can record the failure and carry on.
pub trait ContactTx: Send {
    fn find_by_id(&mut self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>>;

    fn insert(&mut self, contact: Contact) -> BoxFuture<'_, DbResult<Contact>>;

    /// Replaces the row with `contact.id`.
    fn update(&mut self, contact: Contact) -> BoxFuture<'_, DbResult<Contact>>;

    fn insert_note(&mut self, note: NewNote) -> BoxFuture<'_, DbResult<Note>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>>;
}
