//! Redis adapters for session persistence and message deduplication.
//!
//! Both share one multiplexed connection. Keys are namespaced as
//! `{prefix}:{id}` with prefixes taken from configuration.

mod message_deduper;
mod session_store;

pub use message_deduper::RedisMessageDeduper;
pub use session_store::RedisSessionStore;

fn namespaced(prefix: &str, id: &str) -> String {
    format!("{}:{}", prefix, id)
}

fn unavailable(e: redis::RedisError) -> crate::ports::StoreError {
    crate::ports::StoreError::Unavailable(e.to_string())
}
