//! Session Store Port - Interface for persisting intake sessions.
//!
//! Sessions live in an external key-value store with a time-to-live that
//! is refreshed on every save. Nothing is cached in-process; every read
//! goes back to the store.

use async_trait::async_trait;

use crate::domain::foundation::{SessionKey, UserId};
use crate::domain::intake::Session;

/// Errors that can occur during session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to serialize session: {0}")]
    Serialization(String),

    #[error("failed to deserialize session: {0}")]
    Deserialization(String),
}

/// Port for loading and saving sessions.
///
/// # Example
///
/// ```ignore
/// let mut session = store.get_or_create(&key, &user, None).await?;
/// session.append_user_message("hello");
/// store.save(&session).await?;
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session. A missing record is `Ok(None)`, not an error.
    ///
    /// A stored record that can no longer be decoded is logged, removed,
    /// and also returned as `Ok(None)`, so the user starts a fresh session
    /// instead of failing every turn until it expires.
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>, StoreError>;

    /// Write a session, refreshing its time-to-live.
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Delete a session. Deleting a missing record succeeds.
    async fn clear(&self, key: &SessionKey) -> Result<(), StoreError>;

    /// Fetch an existing session with refreshed identity, or build a new one.
    ///
    /// A new session is not written until the caller saves it.
    async fn get_or_create(
        &self,
        key: &SessionKey,
        user_id: &UserId,
        display_name: Option<&str>,
    ) -> Result<Session, StoreError> {
        let display_name = display_name.map(str::to_string);
        match self.get(key).await? {
            Some(mut session) => {
                session.refresh_identity(user_id.clone(), display_name);
                Ok(session)
            }
            None => Ok(Session::new(key.clone(), user_id.clone(), display_name)),
        }
    }
}
