//! In-memory message deduper with a retention window.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::foundation::MessageId;
use crate::ports::{MessageDeduper, StoreError};

/// Claim-once tracker for tests and single-process development.
///
/// Expired claims are pruned lazily on each call.
#[derive(Debug, Clone)]
pub struct InMemoryMessageDeduper {
    claims: Arc<Mutex<HashMap<MessageId, Instant>>>,
    ttl: Duration,
}

impl InMemoryMessageDeduper {
    pub fn new(ttl: Duration) -> Self {
        Self {
            claims: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }
}

impl Default for InMemoryMessageDeduper {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

#[async_trait]
impl MessageDeduper for InMemoryMessageDeduper {
    async fn claim(&self, message_id: &MessageId) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut claims = self.claims.lock().await;
        claims.retain(|_, expires_at| *expires_at > now);

        if claims.contains_key(message_id) {
            return Ok(false);
        }
        claims.insert(message_id.clone(), now + self.ttl);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_claim_is_rejected() {
        let deduper = InMemoryMessageDeduper::default();
        let id = MessageId::new("om_1");
        assert!(deduper.claim(&id).await.unwrap());
        assert!(!deduper.claim(&id).await.unwrap());
    }

    #[tokio::test]
    async fn claim_succeeds_again_after_ttl() {
        let deduper = InMemoryMessageDeduper::new(Duration::from_millis(30));
        let id = MessageId::new("om_1");
        assert!(deduper.claim(&id).await.unwrap());
        assert!(!deduper.claim(&id).await.unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(deduper.claim(&id).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_claims_yield_exactly_one_winner() {
        let deduper = InMemoryMessageDeduper::default();
        let id = MessageId::new("om_race");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let deduper = deduper.clone();
                let id = id.clone();
                tokio::spawn(async move { deduper.claim(&id).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
