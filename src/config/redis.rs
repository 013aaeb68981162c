//! Redis connection and key layout.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where sessions and message claims live.
///
/// Sessions are stored under `{session_key_prefix}:{chat_id}` and expire
/// `session_ttl_secs` after the last save. Claimed message ids are stored
/// under `{dedup_key_prefix}:{message_id}` for `dedup_ttl_secs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// `redis://` or `rediss://` URL. Required.
    pub url: String,
    /// Bound on the initial connect.
    pub timeout_secs: u64,
    pub session_key_prefix: String,
    pub dedup_key_prefix: String,
    pub session_ttl_secs: u64,
    pub dedup_ttl_secs: u64,
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__URL"));
        }
        if !["redis://", "rediss://"].iter().any(|scheme| url.starts_with(scheme)) {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        for (name, ttl) in [
            ("session_ttl_secs", self.session_ttl_secs),
            ("dedup_ttl_secs", self.dedup_ttl_secs),
        ] {
            if ttl == 0 {
                return Err(ValidationError::ZeroTtl(name));
            }
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 5,
            session_key_prefix: "intake:session".to_string(),
            dedup_key_prefix: "intake:processed".to_string(),
            session_ttl_secs: 10 * 60,
            dedup_ttl_secs: 24 * 60 * 60,
        }
    }
}
