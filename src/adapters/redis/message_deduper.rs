//! Redis-backed message deduper using `SET key 1 NX EX ttl`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::domain::foundation::MessageId;
use crate::ports::{MessageDeduper, StoreError};

use super::{namespaced, unavailable};

/// Atomic claim-once backed by Redis.
///
/// `SET NX` answers `OK` only for the first writer; every other caller
/// gets a nil reply until the key expires.
#[derive(Clone)]
pub struct RedisMessageDeduper {
    conn: MultiplexedConnection,
    prefix: String,
    ttl_secs: u64,
}

impl RedisMessageDeduper {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            ttl_secs,
        }
    }
}

#[async_trait]
impl MessageDeduper for RedisMessageDeduper {
    async fn claim(&self, message_id: &MessageId) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(namespaced(&self.prefix, message_id.as_str()))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(reply.is_some())
    }
}

impl std::fmt::Debug for RedisMessageDeduper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMessageDeduper")
            .field("prefix", &self.prefix)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
