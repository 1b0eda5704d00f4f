use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use super::types::{Session, SessionId};

/// Boxed error returned by [`SessionStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Server-side session persistence, keyed by the cookie-held [`SessionId`].
///
/// Implementations decide how records expire. A record that has expired
/// must load as `None`.
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a live session.
    fn load(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Insert or replace a session.
    fn save(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a session (logout). Deleting an unknown id is not an error.
    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically replaces the live record with `new` if it still equals
    /// `current`; `None` removes it instead.
    ///
    /// Returns `false` and leaves the store untouched when the record is
    /// missing, expired or different from `current`.
    fn compare_and_swap(
        &self,
        session_id: &SessionId,
        current: &Session,
        new: Option<Session>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<T: SessionStore> SessionStore for Arc<T> {
    fn load(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send {
        (**self).load(session_id)
    }

    fn save(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save(session_id, session)
    }

    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).delete(session_id)
    }

    fn compare_and_swap(
        &self,
        session_id: &SessionId,
        current: &Session,
        new: Option<Session>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).compare_and_swap(session_id, current, new)
    }
}

struct Entry {
    session: Session,
    expires_at: OffsetDateTime,
}

impl Entry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`SessionStore`] with a sliding TTL.
///
/// Every save pushes the expiry out by `ttl`. Records are dropped lazily on
/// load, or in bulk via [`purge_expired`](Self::purge_expired). Contents are
/// lost on restart.
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, Entry>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Removes every expired record. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.is_live(now));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        purged
    }

    /// Number of stored records, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn expiry(&self, now: OffsetDateTime) -> Result<OffsetDateTime, StoreError> {
        now.checked_add(self.ttl)
            .ok_or_else(|| StoreError::from("session expiry out of range"))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::days(1))
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let expired = match self.sessions.get(session_id) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.session.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove_if(session_id, |_, entry| !entry.is_live(now));
        }
        Ok(None)
    }

    async fn save(&self, session_id: &SessionId, session: Session) -> Result<(), StoreError> {
        let entry = Entry {
            session,
            expires_at: self.expiry(OffsetDateTime::now_utc())?,
        };
        self.sessions.insert(session_id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        session_id: &SessionId,
        current: &Session,
        new: Option<Session>,
    ) -> Result<bool, StoreError> {
        let now = OffsetDateTime::now_utc();
        let unchanged = |entry: &Entry| entry.is_live(now) && entry.session == *current;

        let Some(session) = new else {
            return Ok(self
                .sessions
                .remove_if(session_id, |_, entry| unchanged(entry))
                .is_some());
        };

        let expires_at = self.expiry(now)?;
        // The shard stays write-locked between the check and the swap.
        match self.sessions.get_mut(session_id) {
            Some(mut entry) if unchanged(&*entry) => {
                *entry = Entry {
                    session,
                    expires_at,
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SessionId {
        SessionId::from(s.to_string())
    }

    fn pending(state: &str) -> Session {
        let mut session = Session::default();
        session.begin(state.into());
        session
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemorySessionStore::default();
        store.save(&id("a"), pending("s1")).await.unwrap();

        let loaded = store.load(&id("a")).await.unwrap().unwrap();
        assert_eq!(loaded.pending_state(), Some("s1"));
        assert!(store.load(&id("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = MemorySessionStore::default();
        store.save(&id("a"), pending("s1")).await.unwrap();
        store.save(&id("b"), pending("s2")).await.unwrap();

        store.delete(&id("a")).await.unwrap();
        assert!(store.load(&id("a")).await.unwrap().is_none());
        assert_eq!(
            store.load(&id("b")).await.unwrap().unwrap().pending_state(),
            Some("s2")
        );
    }

    #[tokio::test]
    async fn shared_store_sees_same_records() {
        let store = Arc::new(MemorySessionStore::default());
        let handle = store.clone();
        handle.save(&id("a"), pending("s1")).await.unwrap();
        assert!(store.load(&id("a")).await.unwrap().is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_is_ok() {
        let store = MemorySessionStore::default();
        assert!(store.delete(&id("nope")).await.is_ok());
    }

    #[tokio::test]
    async fn expired_session_loads_as_none() {
        let store = MemorySessionStore::new(Duration::ZERO);
        store.save(&id("a"), pending("s1")).await.unwrap();

        assert!(store.load(&id("a")).await.unwrap().is_none());
        assert!(store.is_empty(), "expired record should be dropped on load");
    }

    #[tokio::test]
    async fn purge_expired_drops_only_expired() {
        let store = MemorySessionStore::new(Duration::ZERO);
        store.save(&id("a"), pending("s1")).await.unwrap();
        store.save(&id("b"), pending("s2")).await.unwrap();
        assert_eq!(store.purge_expired(), 2);

        let store = MemorySessionStore::new(Duration::hours(1));
        store.save(&id("a"), pending("s1")).await.unwrap();
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_an_error() {
        let store = MemorySessionStore::new(Duration::MAX);
        assert!(store.save(&id("a"), pending("s1")).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn compare_and_swap_replaces_only_matching_record() {
        let store = MemorySessionStore::default();
        store.save(&id("a"), pending("s1")).await.unwrap();

        let swapped = store
            .compare_and_swap(&id("a"), &pending("other"), Some(Session::default()))
            .await
            .unwrap();
        assert!(!swapped);
        assert_eq!(
            store.load(&id("a")).await.unwrap().unwrap().pending_state(),
            Some("s1")
        );

        let swapped = store
            .compare_and_swap(&id("a"), &pending("s1"), Some(Session::default()))
            .await
            .unwrap();
        assert!(swapped);
        assert_eq!(store.load(&id("a")).await.unwrap(), Some(Session::default()));

        // Second consumer of the same record loses.
        let swapped = store
            .compare_and_swap(&id("a"), &pending("s1"), Some(Session::default()))
            .await
            .unwrap();
        assert!(!swapped);
    }

    #[tokio::test]
    async fn compare_and_swap_never_resurrects_deleted_record() {
        let store = MemorySessionStore::default();
        store.save(&id("a"), Session::default()).await.unwrap();
        store.delete(&id("a")).await.unwrap();

        for new in [Some(pending("s2")), None] {
            let swapped = store
                .compare_and_swap(&id("a"), &Session::default(), new)
                .await
                .unwrap();
            assert!(!swapped);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn compare_and_swap_with_none_removes() {
        let store = MemorySessionStore::default();
        store.save(&id("a"), pending("s1")).await.unwrap();

        assert!(store
            .compare_and_swap(&id("a"), &pending("s1"), None)
            .await
            .unwrap());
        assert!(store.load(&id("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn compare_and_swap_ignores_expired_record() {
        let store = MemorySessionStore::new(Duration::ZERO);
        store.save(&id("a"), pending("s1")).await.unwrap();

        let swapped = store
            .compare_and_swap(&id("a"), &pending("s1"), Some(Session::default()))
            .await
            .unwrap();
        assert!(!swapped);
    }
}
