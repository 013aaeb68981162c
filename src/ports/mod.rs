//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the intake core and the outside world. Adapters implement these ports.
//!
//! - `SessionStore` - Persistent session records with a refreshed TTL
//! - `MessageDeduper` - Atomic claim-once on inbound message ids
//! - `FieldExtractor` - Text to partial field map
//! - `ChatPlatform` - Messaging, hand-off posts, and file relay

mod chat_platform;
mod field_extractor;
mod message_deduper;
mod session_store;

pub use chat_platform::{ChatPlatform, DownloadedFile, HandoffPost, PlatformError, ThreadRoot};
pub use field_extractor::{ExtractionError, FieldExtractor};
pub use message_deduper::MessageDeduper;
pub use session_store::{SessionStore, StoreError};
