//! In-process implementation of [`ContactStore`].
//!
//! All state lives behind one `tokio::sync::Mutex`. A transaction holds the
//! lock for its whole lifetime and restores a snapshot unless committed, so
//! it gives the same all-or-nothing behaviour as the Postgres backend.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::store::{ContactStore, ContactTx, PutConditions, PutOutcome, new_etag, prepare_write};
use crate::error::{DbError, DbResult};
use crate::model::contact::Contact;
use crate::model::note::{NewNote, Note};
use crate::model::user::User;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    contacts: Vec<Contact>,
    notes: Vec<Note>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn live(&self, owner_id: i64) -> impl Iterator<Item = &Contact> {
        self.contacts
            .iter()
            .filter(move |c| c.owner_id == owner_id && c.deleted_at.is_none())
    }

    fn find_live<F>(&self, owner_id: i64, predicate: F) -> Option<Contact>
    where
        F: Fn(&Contact) -> bool,
    {
        self.live(owner_id).find(|c| predicate(c)).cloned()
    }

    fn position_by_uid(&self, owner_id: i64, uid: &str) -> Option<usize> {
        self.contacts
            .iter()
            .position(|c| c.owner_id == owner_id && c.vcard_uid == uid)
    }

    fn insert(&mut self, mut contact: Contact) -> DbResult<Contact> {
        prepare_write(&mut contact);
        if self
            .position_by_uid(contact.owner_id, &contact.vcard_uid)
            .is_some()
        {
            return Err(DbError::Conflict(format!(
                "duplicate vcard_uid {}",
                contact.vcard_uid
            )));
        }
        let now = Utc::now();
        contact.id = self.next_id();
        contact.etag = new_etag();
        contact.created_at = now;
        contact.updated_at = now;
        contact.deleted_at = None;
        self.contacts.push(contact.clone());
        Ok(contact)
    }

    /// Overwrites the stored row at `idx`, keeping identity and creation time.
    fn replace_at(&mut self, idx: usize, mut contact: Contact) -> Contact {
        prepare_write(&mut contact);
        let stored = &mut self.contacts[idx];
        contact.id = stored.id;
        contact.owner_id = stored.owner_id;
        contact.created_at = stored.created_at;
        contact.etag = new_etag();
        contact.updated_at = Utc::now();
        contact.deleted_at = None;
        *stored = contact.clone();
        contact
    }

    fn update(&mut self, contact: Contact) -> DbResult<Contact> {
        let idx = self
            .contacts
            .iter()
            .position(|c| {
                c.id == contact.id && c.owner_id == contact.owner_id && c.deleted_at.is_none()
            })
            .ok_or(DbError::NotFound)?;
        if let Some(other) = self.position_by_uid(contact.owner_id, &contact.vcard_uid)
            && other != idx
        {
            return Err(DbError::Conflict(format!(
                "duplicate vcard_uid {}",
                contact.vcard_uid
            )));
        }
        Ok(self.replace_at(idx, contact))
    }

    fn insert_note(&mut self, note: NewNote) -> Note {
        let note = Note {
            id: self.next_id(),
            owner_id: note.owner_id,
            contact_id: note.contact_id,
            content: note.content,
            created_at: Utc::now(),
        };
        self.notes.push(note.clone());
        note
    }
}

/// Contact store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContactStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryContactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContactStore for MemoryContactStore {
    fn find_user_by_login<'a>(&'a self, login: &'a str) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .users
                .iter()
                .find(|u| u.username == login || u.email.eq_ignore_ascii_case(login))
                .cloned())
        })
    }

    fn find_user_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.users.iter().find(|u| u.username == username).cloned())
        })
    }

    fn create_user<'a>(
        &'a self,
        username: &'a str,
        email: &'a str,
        password_hash: &'a str,
    ) -> BoxFuture<'a, DbResult<User>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state
                .users
                .iter()
                .any(|u| u.username == username || u.email.eq_ignore_ascii_case(email))
            {
                return Err(DbError::Conflict(format!("user {username} exists")));
            }
            let user = User {
                id: state.next_id(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            };
            state.users.push(user.clone());
            Ok(user)
        })
    }

    fn list_contacts(&self, owner_id: i64) -> BoxFuture<'_, DbResult<Vec<Contact>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.live(owner_id).cloned().collect())
        })
    }

    fn find_by_uid<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.find_live(owner_id, |c| c.vcard_uid == uid))
        })
    }

    fn find_by_id(&self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.find_live(owner_id, |c| c.id == id))
        })
    }

    fn find_by_email<'a>(
        &'a self,
        owner_id: i64,
        email: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let needle = email.trim().to_lowercase();
            let state = self.state.lock().await;
            Ok(state.find_live(owner_id, |c| {
                c.email
                    .as_deref()
                    .is_some_and(|e| e.trim().to_lowercase() == needle)
            }))
        })
    }

    fn find_by_name<'a>(
        &'a self,
        owner_id: i64,
        given_name: &'a str,
        family_name: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let given = given_name.trim().to_lowercase();
            let family = family_name.trim().to_lowercase();
            let state = self.state.lock().await;
            Ok(state.find_live(owner_id, |c| {
                c.given_name
                    .as_deref()
                    .is_some_and(|g| g.trim().to_lowercase() == given)
                    && c.family_name
                        .as_deref()
                        .is_some_and(|f| f.trim().to_lowercase() == family)
            }))
        })
    }

    fn put_contact(
        &self,
        owner_id: i64,
        mut contact: Contact,
        conditions: PutConditions,
    ) -> BoxFuture<'_, DbResult<PutOutcome>> {
        Box::pin(async move {
            contact.owner_id = owner_id;
            let mut state = self.state.lock().await;

            let idx = state.position_by_uid(owner_id, &contact.vcard_uid);
            let live = idx
                .map(|i| &state.contacts[i])
                .filter(|c| c.deleted_at.is_none());
            conditions.check(live)?;

            match idx {
                Some(i) => {
                    let revived = state.contacts[i].deleted_at.is_some();
                    let stored = state.replace_at(i, contact);
                    Ok(if revived {
                        PutOutcome::Created(stored)
                    } else {
                        PutOutcome::Updated(stored)
                    })
                }
                None => Ok(PutOutcome::Created(state.insert(contact)?)),
            }
        })
    }

    fn soft_delete<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
        if_match: Option<&'a str>,
    ) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let idx = state
                .position_by_uid(owner_id, uid)
                .filter(|&i| state.contacts[i].deleted_at.is_none())
                .ok_or(DbError::NotFound)?;
            PutConditions {
                if_match: if_match.map(str::to_string),
                if_none_match: Vec::new(),
            }
            .check(Some(&state.contacts[idx]))?;

            let now = Utc::now();
            let stored = &mut state.contacts[idx];
            stored.deleted_at = Some(now);
            stored.updated_at = now;
            stored.etag = new_etag();
            Ok(())
        })
    }

    fn patch_photo(
        &self,
        owner_id: i64,
        contact_id: i64,
        photo: Option<String>,
        photo_thumbnail: Option<String>,
    ) -> BoxFuture<'_, DbResult<Contact>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let stored = state
                .contacts
                .iter_mut()
                .find(|c| c.id == contact_id && c.owner_id == owner_id && c.deleted_at.is_none())
                .ok_or(DbError::NotFound)?;
            stored.photo = photo;
            stored.photo_thumbnail = photo_thumbnail;
            stored.etag = new_etag();
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        })
    }

    fn list_notes(&self, owner_id: i64, contact_id: i64) -> BoxFuture<'_, DbResult<Vec<Note>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .notes
                .iter()
                .filter(|n| n.owner_id == owner_id && n.contact_id == contact_id)
                .cloned()
                .collect())
        })
    }

    fn begin(&self) -> BoxFuture<'_, DbResult<Box<dyn ContactTx>>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let snapshot = guard.clone();
            Ok(Box::new(MemoryContactTx {
                guard,
                snapshot: Some(snapshot),
            }) as Box<dyn ContactTx>)
        })
    }
}

/// Exclusive access to the store plus the state to restore on rollback.
struct MemoryContactTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryContactTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl ContactTx for MemoryContactTx {
    fn find_by_id(&mut self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>> {
        Box::pin(async move { Ok(self.guard.find_live(owner_id, |c| c.id == id)) })
    }

    fn insert(&mut self, contact: Contact) -> BoxFuture<'_, DbResult<Contact>> {
        Box::pin(async move { self.guard.insert(contact) })
    }

    fn update(&mut self, contact: Contact) -> BoxFuture<'_, DbResult<Contact>> {
        Box::pin(async move { self.guard.update(contact) })
    }

    fn insert_note(&mut self, note: NewNote) -> BoxFuture<'_, DbResult<Note>> {
        Box::pin(async move { Ok(self.guard.insert_note(note)) })
    }

    fn commit(mut self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        self.snapshot = None;
        Box::pin(async move {
            drop(self);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            drop(self);
            Ok(())
        })
    }
}
