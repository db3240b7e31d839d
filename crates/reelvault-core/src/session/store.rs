//! Sessions keyed by admin user id, one at most per user.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::Session;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
    /// Unset keeps sessions until completed or cancelled.
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The user's live session. Expired sessions are evicted on read.
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let session = self.sessions.read().await.get(&user_id).cloned()?;
        if let Some(ttl) = self.ttl
            && session.is_stale(ttl.as_millis() as i64)
        {
            debug!("Session of {} expired ({:?})", user_id, session.action);
            self.sessions.write().await.remove(&user_id);
            return None;
        }
        Some(session)
    }

    /// Store `session`, replacing whatever the user had pending.
    pub async fn set(&self, user_id: i64, mut session: Session) -> Option<Session> {
        session.touch();
        self.sessions.write().await.insert(user_id, session)
    }

    /// Run `step` on the user's session under the write lock, so inputs of
    /// one user are consumed one at a time. `step` returns whether the
    /// session stays; `None` means the user had no live session.
    pub async fn with_session<R>(
        &self,
        user_id: i64,
        step: impl FnOnce(&mut Session) -> (R, bool),
    ) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&user_id)?;
        if let Some(ttl) = self.ttl
            && session.is_stale(ttl.as_millis() as i64)
        {
            debug!("Session of {} expired ({:?})", user_id, session.action);
            sessions.remove(&user_id);
            return None;
        }

        let (result, keep) = step(session);
        if keep {
            session.touch();
        } else {
            sessions.remove(&user_id);
        }
        Some(result)
    }

    pub async fn clear(&self, user_id: i64) -> Option<Session> {
        self.sessions.write().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogCoordinates;
    use crate::session::SessionAction;

    fn session() -> Session {
        Session::new(SessionAction::AddingSeason, CatalogCoordinates::series("s1"))
    }

    #[tokio::test]
    async fn test_one_session_per_user() {
        let store = SessionStore::default();
        assert!(store.set(1, session()).await.is_none());
        let replaced = store
            .set(
                1,
                Session::new(SessionAction::UpdatingPoster, CatalogCoordinates::series("s2")),
            )
            .await;
        assert_eq!(replaced.unwrap().action, SessionAction::AddingSeason);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(1).await.unwrap().action, SessionAction::UpdatingPoster);
        assert!(store.get(2).await.is_none());
    }

    #[tokio::test]
    async fn test_without_ttl_sessions_persist() {
        let store = SessionStore::new(None);
        store.set(1, session()).await;
        store
            .sessions
            .write()
            .await
            .get_mut(&1)
            .unwrap()
            .last_activity -= 86_400_000;
        assert!(store.get(1).await.is_some());
    }

    #[tokio::test]
    async fn test_ttl_evicts_lazily() {
        let store = SessionStore::new(Some(Duration::from_secs(60)));
        store.set(1, session()).await;
        assert!(store.get(1).await.is_some());

        store
            .sessions
            .write()
            .await
            .get_mut(&1)
            .unwrap()
            .last_activity -= 61_000;
        assert!(store.get(1).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SessionStore::default();
        store.set(1, session()).await;
        assert!(store.clear(1).await.is_some());
        assert!(store.clear(1).await.is_none());
    }
}
