//! In-memory session store with expiry, for tests and development.
//!
//! Not suitable for multi-instance deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::SessionKey;
use crate::domain::intake::Session;
use crate::ports::{SessionStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    session: Session,
    expires_at: Instant,
}

/// Session store backed by a `HashMap`, with a TTL refreshed on save.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<SessionKey, Entry>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.session.clone()))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let entry = Entry {
            session: session.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(session.key().clone(), entry);
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn session(key: &str) -> Session {
        Session::new(SessionKey::new(key), UserId::new("ou_1"), None)
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_key() {
        let store = InMemorySessionStore::default();
        assert!(store.get(&SessionKey::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_get_returns_session() {
        let store = InMemorySessionStore::default();
        let s = session("oc_1");
        store.save(&s).await.unwrap();
        assert_eq!(store.get(s.key()).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = InMemorySessionStore::default();
        let s = session("oc_1");
        store.save(&s).await.unwrap();
        store.clear(s.key()).await.unwrap();
        store.clear(s.key()).await.unwrap();
        assert!(store.get(s.key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sessions_expire_after_ttl() {
        let store = InMemorySessionStore::new(Duration::from_millis(30));
        let s = session("oc_1");
        store.save(&s).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get(s.key()).await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn get_or_create_refreshes_identity() {
        let store = InMemorySessionStore::default();
        store.save(&session("oc_1")).await.unwrap();

        let s = store
            .get_or_create(&SessionKey::new("oc_1"), &UserId::new("ou_2"), Some("Ann"))
            .await
            .unwrap();
        assert_eq!(s.user_id().as_str(), "ou_2");
        assert_eq!(s.display_name(), Some("Ann"));
    }

    #[tokio::test]
    async fn get_or_create_builds_fresh_session_without_saving() {
        let store = InMemorySessionStore::default();
        let key = SessionKey::new("oc_new");
        let s = store.get_or_create(&key, &UserId::new("ou_1"), None).await.unwrap();
        assert!(s.messages().is_empty());
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
