//! Message Deduper Port - exactly-once claims on inbound message ids.
//!
//! Chat platforms redeliver events on timeouts and retries. A claim is an
//! atomic "set if absent" with a bounded retention window, so concurrent
//! deliveries of the same message see exactly one successful claim.

use async_trait::async_trait;

use crate::domain::foundation::MessageId;

use super::StoreError;

/// Port for claiming inbound messages.
#[async_trait]
pub trait MessageDeduper: Send + Sync {
    /// Claim a message id.
    ///
    /// Returns `true` for the first claim within the retention window and
    /// `false` for every later one. Callers must treat an error as "not
    /// claimed" and drop the message.
    async fn claim(&self, message_id: &MessageId) -> Result<bool, StoreError>;
}
