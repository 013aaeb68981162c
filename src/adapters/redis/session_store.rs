//! Redis-backed session store.
//!
//! Sessions are stored as JSON under `{prefix}:{session_key}` with
//! `SET ... EX ttl`, so every save refreshes the expiry. A record that no
//! longer decodes is deleted and reported as absent.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::SessionKey;
use crate::domain::intake::Session;
use crate::ports::{SessionStore, StoreError};

use super::{namespaced, unavailable};

/// Session store for multi-instance deployments.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    prefix: String,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    fn key(&self, key: &SessionKey) -> String {
        namespaced(&self.prefix, key.as_str())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let mut conn = self.conn.clone();

        let redis_key = self.key(key);
        let Some(json) = conn.get::<_, Option<String>>(&redis_key).await.map_err(unavailable)? else {
            return Ok(None);
        };

        match decode_session(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(session_key = %key, error = %e, "discarding unreadable session");
                conn.del::<_, ()>(&redis_key).await.map_err(unavailable)?;
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(self.key(session.key()))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(self.key(key)).await.map_err(unavailable)?;

        Ok(())
    }
}

fn decode_session(json: &str) -> Result<Session, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Deserialization(e.to_string()))
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("prefix", &self.prefix)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
