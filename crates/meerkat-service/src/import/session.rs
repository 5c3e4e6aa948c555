//! Short-lived import sessions.
//!
//! A session carries an upload from the upload step through preview to
//! confirm. Sessions belong to the user who created them; lookups by anyone
//! else behave as if the session did not exist. Expired sessions are
//! removed on access and by [`ImportSessions::sweep_expired`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::csv::CsvDocument;
use super::types::{ColumnMapping, ImportKind, RowPreview};
use super::vcf::VcfEntry;

/// The uploaded content a session holds.
#[derive(Debug, Clone)]
pub enum SessionPayload {
    Csv(CsvDocument),
    Vcf(Vec<VcfEntry>),
}

impl SessionPayload {
    #[must_use]
    pub const fn kind(&self) -> ImportKind {
        match self {
            Self::Csv(_) => ImportKind::Csv,
            Self::Vcf(_) => ImportKind::Vcf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: String,
    pub owner_id: i64,
    pub expires_at: Instant,
    pub payload: SessionPayload,
    /// Mappings used by the last CSV preview.
    pub mappings: Vec<ColumnMapping>,
    /// Rows of the last preview; `None` until one has been computed.
    pub previews: Option<Vec<RowPreview>>,
}

impl ImportSession {
    /// Opens a session with a fresh random id.
    #[must_use]
    pub fn new(owner_id: i64, payload: SessionPayload, ttl: Duration) -> Self {
        Self {
            id: hex::encode(rand::random::<[u8; 16]>()),
            owner_id,
            expires_at: Instant::now() + ttl,
            payload,
            mappings: Vec::new(),
            previews: None,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Storage for import sessions.
pub trait ImportSessions: Send + Sync {
    fn insert(&self, session: ImportSession) -> BoxFuture<'_, ()>;

    /// The live session `id` if it belongs to `owner_id`.
    fn get<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, Option<Arc<ImportSession>>>;

    /// Records a computed preview. Returns the updated session, or `None`
    /// when the session is gone or belongs to someone else.
    fn mark_previewed<'a>(
        &'a self,
        id: &'a str,
        owner_id: i64,
        mappings: Vec<ColumnMapping>,
        previews: Vec<RowPreview>,
    ) -> BoxFuture<'a, Option<Arc<ImportSession>>>;

    /// Removes and returns the live session `id` if it belongs to
    /// `owner_id`. At most one caller gets a given session.
    fn take<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, Option<Arc<ImportSession>>>;

    /// Removes the session. Returns whether it existed for `owner_id`.
    fn delete<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, bool>;

    /// Drops every expired session, returning how many were removed.
    fn sweep_expired(&self) -> BoxFuture<'_, usize>;
}

/// Process-local sessions.
#[derive(Debug, Default)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<String, Arc<ImportSession>>>,
}

impl InMemorySessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl ImportSessions for InMemorySessions {
    fn insert(&self, session: ImportSession) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            tracing::debug!(
                session_id = %session.id,
                owner_id = session.owner_id,
                "Opened import session"
            );
            self.sessions
                .write()
                .await
                .insert(session.id.clone(), Arc::new(session));
        })
    }

    fn get<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, Option<Arc<ImportSession>>> {
        Box::pin(async move {
            let session = self.sessions.read().await.get(id).cloned()?;
            if session.is_expired() {
                let mut sessions = self.sessions.write().await;
                if sessions.get(id).is_some_and(|s| s.is_expired()) {
                    sessions.remove(id);
                    tracing::debug!(session_id = %id, "Removed expired import session");
                }
                return None;
            }
            (session.owner_id == owner_id).then_some(session)
        })
    }

    fn mark_previewed<'a>(
        &'a self,
        id: &'a str,
        owner_id: i64,
        mappings: Vec<ColumnMapping>,
        previews: Vec<RowPreview>,
    ) -> BoxFuture<'a, Option<Arc<ImportSession>>> {
        Box::pin(async move {
            let mut sessions = self.sessions.write().await;
            let current = sessions.get(id)?;
            if current.owner_id != owner_id || current.is_expired() {
                return None;
            }
            let mut updated = ImportSession::clone(current);
            updated.mappings = mappings;
            updated.previews = Some(previews);
            let updated = Arc::new(updated);
            sessions.insert(id.to_string(), Arc::clone(&updated));
            Some(updated)
        })
    }

    fn take<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, Option<Arc<ImportSession>>> {
        Box::pin(async move {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get(id)?;
            if session.is_expired() {
                sessions.remove(id);
                tracing::debug!(session_id = %id, "Removed expired import session");
                return None;
            }
            if session.owner_id != owner_id {
                return None;
            }
            sessions.remove(id)
        })
    }

    fn delete<'a>(&'a self, id: &'a str, owner_id: i64) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let mut sessions = self.sessions.write().await;
            if sessions.get(id).is_some_and(|s| s.owner_id == owner_id) {
                sessions.remove(id);
                true
            } else {
                false
            }
        })
    }

    fn sweep_expired(&self) -> BoxFuture<'_, usize> {
        Box::pin(async move {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, session| !session.is_expired());
            let removed = before - sessions.len();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired import sessions");
            }
            removed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(15 * 60);

    fn session(owner_id: i64) -> ImportSession {
        ImportSession::new(
            owner_id,
            SessionPayload::Csv(CsvDocument {
                headers: vec!["Name".to_string()],
                rows: vec![vec!["Ann".to_string()]],
            }),
            TTL,
        )
    }

    #[test]
    fn ids_are_random_hex() {
        let a = session(1);
        let b = session(1);
        assert_eq!(a.id.len(), 32);
        assert!(a.id.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.id, b.id);
    }

    #[test_log::test(tokio::test)]
    async fn sessions_are_private_to_their_owner() {
        let sessions = InMemorySessions::new();
        let s = session(1);
        let id = s.id.clone();
        sessions.insert(s).await;

        assert!(sessions.get(&id, 2).await.is_none());
        assert!(!sessions.delete(&id, 2).await);
        assert!(sessions.mark_previewed(&id, 2, Vec::new(), Vec::new()).await.is_none());

        let own = sessions.get(&id, 1).await.unwrap();
        assert!(own.previews.is_none());
        let updated = sessions.mark_previewed(&id, 1, Vec::new(), Vec::new()).await.unwrap();
        assert_eq!(updated.previews.as_deref(), Some(&[][..]));
        assert!(sessions.delete(&id, 1).await);
        assert!(sessions.get(&id, 1).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn take_hands_out_a_session_once() {
        let sessions = InMemorySessions::new();
        let s = session(1);
        let id = s.id.clone();
        sessions.insert(s).await;

        assert!(sessions.take(&id, 2).await.is_none());
        assert_eq!(sessions.take(&id, 1).await.map(|s| s.owner_id), Some(1));
        assert!(sessions.take(&id, 1).await.is_none());
        assert!(sessions.is_empty().await);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn expired_sessions_are_removed_on_access() {
        let sessions = InMemorySessions::new();
        let s = session(1);
        let id = s.id.clone();
        sessions.insert(s).await;

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(sessions.get(&id, 1).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(sessions.get(&id, 1).await.is_none());
        assert!(sessions.is_empty().await);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn sweep_drops_only_expired_sessions() {
        let sessions = InMemorySessions::new();
        sessions.insert(session(1)).await;
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let fresh = session(2);
        let fresh_id = fresh.id.clone();
        sessions.insert(fresh).await;

        assert_eq!(sessions.sweep_expired().await, 1);
        assert_eq!(sessions.len().await, 1);
        assert!(sessions.get(&fresh_id, 2).await.is_some());
    }
}
