//! `PostgreSQL` implementation of [`ContactStore`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{
    AnsiTransactionManager, AsyncConnection, AsyncPgConnection, RunQueryDsl, TransactionManager,
};
use futures::future::BoxFuture;

use crate::db::connection::{DbConnection, DbPool};
use crate::db::schema::{contacts, notes, users};
use crate::db::store::{
    ContactStore, ContactTx, PutConditions, PutOutcome, escape_like, new_etag, prepare_write,
};
use crate::error::{DbError, DbResult};
use crate::model::contact::{Contact, ContactWrite};
use crate::model::note::{NewNote, Note};
use crate::model::user::{NewUser, User};

/// Contact store backed by a bb8 pool of async Postgres connections.
#[derive(Clone)]
pub struct PgContactStore {
    pool: DbPool,
}

impl PgContactStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> DbResult<DbConnection<'_>> {
        Ok(self.pool.get().await?)
    }
}

fn live_contacts(owner_id: i64) -> contacts::BoxedQuery<'static, diesel::pg::Pg> {
    contacts::table
        .filter(contacts::owner_id.eq(owner_id))
        .filter(contacts::deleted_at.is_null())
        .into_boxed()
}

async fn first_live(
    conn: &mut AsyncPgConnection,
    query: contacts::BoxedQuery<'static, diesel::pg::Pg>,
) -> DbResult<Option<Contact>> {
    Ok(query
        .select(Contact::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Locks the row for `(owner_id, uid)`, live or soft-deleted.
async fn lock_by_uid(
    conn: &mut AsyncPgConnection,
    owner_id: i64,
    uid: &str,
) -> DbResult<Option<Contact>> {
    Ok(contacts::table
        .filter(contacts::owner_id.eq(owner_id))
        .filter(contacts::vcard_uid.eq(uid))
        .for_update()
        .select(Contact::as_select())
        .first(conn)
        .await
        .optional()?)
}

async fn put_locked(
    conn: &mut AsyncPgConnection,
    owner_id: i64,
    mut contact: Contact,
    conditions: &PutConditions,
) -> DbResult<PutOutcome> {
    contact.owner_id = owner_id;
    prepare_write(&mut contact);

    let row = lock_by_uid(conn, owner_id, &contact.vcard_uid).await?;
    let live = row.as_ref().filter(|c| c.deleted_at.is_none());
    conditions.check(live)?;

    let etag = new_etag();
    let write = ContactWrite::new(&contact, &etag);

    match row {
        Some(existing) => {
            let revived = existing.deleted_at.is_some();
            let updated = diesel::update(contacts::table.find(existing.id))
                .set((write, contacts::deleted_at.eq(None::<DateTime<Utc>>)))
                .returning(Contact::as_returning())
                .get_result(conn)
                .await?;
            if revived {
                Ok(PutOutcome::Created(updated))
            } else {
                Ok(PutOutcome::Updated(updated))
            }
        }
        None => {
            let inserted = diesel::insert_into(contacts::table)
                .values(&write)
                .returning(Contact::as_returning())
                .get_result(conn)
                .await?;
            Ok(PutOutcome::Created(inserted))
        }
    }
}

impl ContactStore for PgContactStore {
    fn find_user_by_login<'a>(&'a self, login: &'a str) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Ok(users::table
                .filter(
                    users::username
                        .eq(login)
                        .or(users::email.ilike(escape_like(login))),
                )
                .select(User::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn find_user_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Ok(users::table
                .filter(users::username.eq(username))
                .select(User::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn create_user<'a>(
        &'a self,
        username: &'a str,
        email: &'a str,
        password_hash: &'a str,
    ) -> BoxFuture<'a, DbResult<User>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Ok(diesel::insert_into(users::table)
                .values(&NewUser {
                    username,
                    email,
                    password_hash,
                })
                .returning(User::as_returning())
                .get_result(&mut conn)
                .await?)
        })
    }

    #[tracing::instrument(skip(self))]
    fn list_contacts(&self, owner_id: i64) -> BoxFuture<'_, DbResult<Vec<Contact>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Ok(live_contacts(owner_id)
                .order(contacts::id.asc())
                .select(Contact::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn find_by_uid<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            let query = live_contacts(owner_id).filter(contacts::vcard_uid.eq(uid.to_string()));
            first_live(&mut conn, query).await
        })
    }

    fn find_by_id(&self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            first_live(&mut conn, live_contacts(owner_id).filter(contacts::id.eq(id))).await
        })
    }

    fn find_by_email<'a>(
        &'a self,
        owner_id: i64,
        email: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            let query = live_contacts(owner_id)
                .filter(contacts::email.ilike(escape_like(email.trim())))
                .order(contacts::id.asc());
            first_live(&mut conn, query).await
        })
    }

    fn find_by_name<'a>(
        &'a self,
        owner_id: i64,
        given_name: &'a str,
        family_name: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<Contact>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            let query = live_contacts(owner_id)
                .filter(contacts::given_name.ilike(escape_like(given_name.trim())))
                .filter(contacts::family_name.ilike(escape_like(family_name.trim())))
                .order(contacts::id.asc());
            first_live(&mut conn, query).await
        })
    }

    #[tracing::instrument(skip(self, contact, conditions), fields(uid = %contact.vcard_uid))]
    fn put_contact(
        &self,
        owner_id: i64,
        contact: Contact,
        conditions: PutConditions,
    ) -> BoxFuture<'_, DbResult<PutOutcome>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            conn.transaction::<_, DbError, _>(|conn| {
                async move { put_locked(conn, owner_id, contact, &conditions).await }.scope_boxed()
            })
            .await
        })
    }

    #[tracing::instrument(skip(self, if_match))]
    fn soft_delete<'a>(
        &'a self,
        owner_id: i64,
        uid: &'a str,
        if_match: Option<&'a str>,
    ) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            conn.transaction::<_, DbError, _>(|conn| {
                async move {
                    let row = lock_by_uid(conn, owner_id, uid).await?;
                    let Some(live) = row.filter(|c| c.deleted_at.is_none()) else {
                        return Err(DbError::NotFound);
                    };
                    PutConditions {
                        if_match: if_match.map(str::to_string),
                        if_none_match: Vec::new(),
                    }
                    .check(Some(&live))?;

                    let now = Utc::now();
                    diesel::update(contacts::table.find(live.id))
                        .set((
                            contacts::deleted_at.eq(Some(now)),
                            contacts::updated_at.eq(now),
                            contacts::etag.eq(new_etag()),
                        ))
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await
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
            let mut conn = self.conn().await?;
            let target = contacts::table
                .filter(contacts::id.eq(contact_id))
                .filter(contacts::owner_id.eq(owner_id))
                .filter(contacts::deleted_at.is_null());
            Ok(diesel::update(target)
                .set((
                    contacts::photo.eq(photo),
                    contacts::photo_thumbnail.eq(photo_thumbnail),
                    contacts::etag.eq(new_etag()),
                    contacts::updated_at.eq(Utc::now()),
                ))
                .returning(Contact::as_returning())
                .get_result(&mut conn)
                .await?)
        })
    }

    fn list_notes(&self, owner_id: i64, contact_id: i64) -> BoxFuture<'_, DbResult<Vec<Note>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Ok(notes::table
                .filter(notes::owner_id.eq(owner_id))
                .filter(notes::contact_id.eq(contact_id))
                .order(notes::id.asc())
                .select(Note::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn begin(&self) -> BoxFuture<'_, DbResult<Box<dyn ContactTx>>> {
        Box::pin(async move {
            let mut conn = self.pool.get_owned().await?;
            AnsiTransactionManager::begin_transaction(&mut *conn).await?;
            tracing::debug!("Transaction opened");
            Ok(Box::new(PgContactTx { conn }) as Box<dyn ContactTx>)
        })
    }
}

/// A transaction holding its own pooled connection.
///
/// Each write runs inside a savepoint so a failed statement leaves the outer
/// transaction usable.
pub struct PgContactTx {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl ContactTx for PgContactTx {
    fn find_by_id(&mut self, owner_id: i64, id: i64) -> BoxFuture<'_, DbResult<Option<Contact>>> {
        Box::pin(async move {
            first_live(&mut self.conn, live_contacts(owner_id).filter(contacts::id.eq(id))).await
        })
    }

    fn insert(&mut self, mut contact: Contact) -> BoxFuture<'_, DbResult<Contact>> {
        Box::pin(async move {
            prepare_write(&mut contact);
            self.conn
                .transaction::<_, DbError, _>(|conn| {
                    async move {
                        let etag = new_etag();
                        Ok(diesel::insert_into(contacts::table)
                            .values(&ContactWrite::new(&contact, &etag))
                            .returning(Contact::as_returning())
                            .get_result(conn)
                            .await?)
                    }
                    .scope_boxed()
                })
                .await
        })
    }

    fn update(&mut self, mut contact: Contact) -> BoxFuture<'_, DbResult<Contact>> {
        Box::pin(async move {
            prepare_write(&mut contact);
            self.conn
                .transaction::<_, DbError, _>(|conn| {
                    async move {
                        let etag = new_etag();
                        let target = contacts::table
                            .filter(contacts::id.eq(contact.id))
                            .filter(contacts::owner_id.eq(contact.owner_id))
                            .filter(contacts::deleted_at.is_null());
                        Ok(diesel::update(target)
                            .set(&ContactWrite::new(&contact, &etag))
                            .returning(Contact::as_returning())
                            .get_result(conn)
                            .await?)
                    }
                    .scope_boxed()
                })
                .await
        })
    }

    fn insert_note(&mut self, note: NewNote) -> BoxFuture<'_, DbResult<Note>> {
        Box::pin(async move {
            self.conn
                .transaction::<_, DbError, _>(|conn| {
                    async move {
                        Ok(diesel::insert_into(notes::table)
                            .values(&note)
                            .returning(Note::as_returning())
                            .get_result(conn)
                            .await?)
                    }
                    .scope_boxed()
                })
                .await
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            let mut this = self;
            AnsiTransactionManager::commit_transaction(&mut *this.conn).await?;
            tracing::debug!("Transaction committed");
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            let mut this = self;
            AnsiTransactionManager::rollback_transaction(&mut *this.conn).await?;
            tracing::debug!("Transaction rolled back");
            Ok(())
        })
    }
}
