//! In-memory adapters for tests and single-process development.

mod chat_platform;
mod message_deduper;
mod session_store;

pub use chat_platform::{PlatformCall, RecordingChatPlatform};
pub use message_deduper::InMemoryMessageDeduper;
pub use session_store::InMemorySessionStore;
