//! Chat Platform Port - outbound messaging and file primitives.
//!
//! Covers what the intake flow needs from the chat platform: replies to
//! the user, the hand-off post with its thread, and file relay between
//! chats. Platform file references are only valid in the chat they were
//! sent in, so relaying a file means download, upload, then reply.

use async_trait::async_trait;

use crate::domain::foundation::{MessageId, SessionKey, UserId};

/// Reference to a posted message that later replies attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRoot(pub MessageId);

impl ThreadRoot {
    pub fn message_id(&self) -> &MessageId {
        &self.0
    }
}

/// A file fetched from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    /// Name reported by the platform, if any.
    pub file_name: Option<String>,
}

/// Rich-text post for the hand-off chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffPost {
    pub title: String,
    pub body: String,
    /// User to mention at the top of the post.
    pub mention: Option<UserId>,
}

/// Port for chat platform operations.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a text message to a chat.
    async fn send_text(&self, chat: &SessionKey, text: &str) -> Result<(), PlatformError>;

    /// Reply to a specific message with text.
    async fn reply_text(&self, message: &MessageId, text: &str) -> Result<(), PlatformError>;

    /// Add a user to a chat.
    async fn invite_user(&self, chat: &str, user: &UserId) -> Result<(), PlatformError>;

    /// Post a message that becomes a thread root.
    async fn post_summary(&self, chat: &str, post: &HandoffPost) -> Result<ThreadRoot, PlatformError>;

    /// Download a file or image attached to a message.
    async fn download_file(
        &self,
        message: &MessageId,
        file_key: &str,
        resource_type: &str,
    ) -> Result<DownloadedFile, PlatformError>;

    /// Upload bytes, returning a fresh file key.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, PlatformError>;

    /// Reply with an uploaded file inside a thread.
    async fn reply_file_in_thread(&self, root: &ThreadRoot, file_key: &str) -> Result<(), PlatformError>;
}

/// Errors from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Credentials rejected or token unavailable.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Platform answered with a non-zero business code.
    #[error("platform error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Call exceeded its deadline.
    #[error("platform call timed out")]
    Timeout,

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}
