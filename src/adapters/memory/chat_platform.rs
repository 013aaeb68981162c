//! Recording chat platform for testing.
//!
//! Records every outbound call, hands out sequential ids for posts and
//! uploads, and can be told to fail or stall individual operations.
//!
//! # Example
//!
//! ```ignore
//! let platform = RecordingChatPlatform::new()
//!     .with_file("file_1", b"log line".to_vec(), Some("app.log"))
//!     .failing_download("file_2");
//!
//! pipeline.run(&session).await?;
//! assert_eq!(platform.thread_files().len(), 1);
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::foundation::{MessageId, SessionKey, UserId};
use crate::ports::{ChatPlatform, DownloadedFile, HandoffPost, PlatformError, ThreadRoot};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SendText { chat: SessionKey, text: String },
    ReplyText { message: MessageId, text: String },
    Invite { chat: String, user: UserId },
    PostSummary { chat: String, post: HandoffPost, root: ThreadRoot },
    Download { message: MessageId, file_key: String },
    Upload { file_name: String, size: usize, file_key: String },
    ReplyFile { root: ThreadRoot, file_key: String },
}

#[derive(Debug, Default)]
struct Failures {
    send: bool,
    invite: bool,
    post: bool,
    downloads: HashSet<String>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<PlatformCall>,
    files: HashMap<String, (Vec<u8>, Option<String>)>,
    failures: Failures,
    next_id: u64,
}

/// Chat platform double that records calls instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingChatPlatform {
    state: Arc<Mutex<State>>,
    download_delay: Duration,
}

impl RecordingChatPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers downloadable content for a file key.
    pub fn with_file(self, file_key: &str, bytes: Vec<u8>, file_name: Option<&str>) -> Self {
        self.lock()
            .files
            .insert(file_key.to_string(), (bytes, file_name.map(str::to_string)));
        self
    }

    /// Downloads of this file key fail.
    pub fn failing_download(self, file_key: &str) -> Self {
        self.lock().failures.downloads.insert(file_key.to_string());
        self
    }

    /// Invitations fail, as when the user is already a member.
    pub fn failing_invite(self) -> Self {
        self.lock().failures.invite = true;
        self
    }

    /// Hand-off posts fail.
    pub fn failing_post(self) -> Self {
        self.lock().failures.post = true;
        self
    }

    /// Text sends and replies fail.
    pub fn failing_send(self) -> Self {
        self.lock().failures.send = true;
        self
    }

    /// Every download sleeps before answering.
    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Texts sent to chats.
    pub fn sent_texts(&self) -> Vec<(SessionKey, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::SendText { chat, text } => Some((chat, text)),
                _ => None,
            })
            .collect()
    }

    /// Texts sent as replies to messages.
    pub fn replies(&self) -> Vec<(MessageId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::ReplyText { message, text } => Some((message, text)),
                _ => None,
            })
            .collect()
    }

    /// Hand-off posts that succeeded.
    pub fn posts(&self) -> Vec<(HandoffPost, ThreadRoot)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::PostSummary { post, root, .. } => Some((post, root)),
                _ => None,
            })
            .collect()
    }

    /// Files replied into threads, as (root, uploaded file name).
    pub fn thread_files(&self) -> Vec<(ThreadRoot, String)> {
        let calls = self.calls();
        let names: HashMap<String, String> = calls
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Upload {
                    file_name, file_key, ..
                } => Some((file_key.clone(), file_name.clone())),
                _ => None,
            })
            .collect();

        calls
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::ReplyFile { root, file_key } => {
                    let name = names.get(&file_key).cloned().unwrap_or(file_key);
                    Some((root, name))
                }
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: PlatformCall) {
        self.lock().calls.push(call);
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        format!("{}_{}", prefix, state.next_id)
    }
}

#[async_trait]
impl ChatPlatform for RecordingChatPlatform {
    async fn send_text(&self, chat: &SessionKey, text: &str) -> Result<(), PlatformError> {
        if self.lock().failures.send {
            return Err(PlatformError::Network("send disabled".into()));
        }
        self.record(PlatformCall::SendText {
            chat: chat.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply_text(&self, message: &MessageId, text: &str) -> Result<(), PlatformError> {
        if self.lock().failures.send {
            return Err(PlatformError::Network("send disabled".into()));
        }
        self.record(PlatformCall::ReplyText {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn invite_user(&self, chat: &str, user: &UserId) -> Result<(), PlatformError> {
        if self.lock().failures.invite {
            return Err(PlatformError::Api {
                code: 232_006,
                msg: "user already in chat".into(),
            });
        }
        self.record(PlatformCall::Invite {
            chat: chat.to_string(),
            user: user.clone(),
        });
        Ok(())
    }

    async fn post_summary(&self, chat: &str, post: &HandoffPost) -> Result<ThreadRoot, PlatformError> {
        if self.lock().failures.post {
            return Err(PlatformError::Network("post disabled".into()));
        }
        let root = ThreadRoot(MessageId::new(self.next_id("om_root")));
        self.record(PlatformCall::PostSummary {
            chat: chat.to_string(),
            post: post.clone(),
            root: root.clone(),
        });
        Ok(root)
    }

    async fn download_file(
        &self,
        message: &MessageId,
        file_key: &str,
        _resource_type: &str,
    ) -> Result<DownloadedFile, PlatformError> {
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }

        self.record(PlatformCall::Download {
            message: message.clone(),
            file_key: file_key.to_string(),
        });

        let state = self.lock();
        if state.failures.downloads.contains(file_key) {
            return Err(PlatformError::Api {
                code: 234_003,
                msg: "file not found".into(),
            });
        }
        let (bytes, file_name) = state
            .files
            .get(file_key)
            .cloned()
            .unwrap_or_else(|| (file_key.as_bytes().to_vec(), None));
        Ok(DownloadedFile { bytes, file_name })
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, PlatformError> {
        let file_key = self.next_id("file_relayed");
        self.record(PlatformCall::Upload {
            file_name: file_name.to_string(),
            size: bytes.len(),
            file_key: file_key.clone(),
        });
        Ok(file_key)
    }

    async fn reply_file_in_thread(&self, root: &ThreadRoot, file_key: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::ReplyFile {
            root: root.clone(),
            file_key: file_key.to_string(),
        });
        Ok(())
    }
}
