//! Escalation pipeline - hands a case off to the support chat.
//!
//! Steps, in order:
//! 1. Invite the user into the hand-off chat (best effort)
//! 2. Post the case summary, mentioning the user (mandatory; its message
//!    becomes the thread root)
//! 3. Relay each file into that thread, in arrival order (best effort,
//!    per file)
//! 4. Tell the user the case was submitted (best effort)
//! 5. Clear the session so the case cannot be submitted twice

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::intake::{render, FieldSchema, FileAttachment, Session};
use crate::ports::{ChatPlatform, HandoffPost, PlatformError, SessionStore, StoreError, ThreadRoot};

use super::best_effort::{best_effort, with_deadline};

/// File name used when neither the platform nor the session knows one.
const FALLBACK_FILE_NAME: &str = "attachment";

/// Errors that stop or spoil a hand-off.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The case summary could not be posted; nothing was handed off.
    #[error("failed to post case summary: {0}")]
    SummaryPost(#[source] PlatformError),

    /// The case was posted but the session could not be cleared.
    #[error("case posted but session not cleared: {0}")]
    Store(#[source] StoreError),
}

impl EscalationError {
    /// True if the case reached the hand-off chat despite the error.
    pub fn case_posted(&self) -> bool {
        matches!(self, EscalationError::Store(_))
    }
}

/// What a completed hand-off did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationReport {
    pub thread_root: ThreadRoot,
    pub invited: bool,
    pub files_relayed: usize,
    pub files_failed: usize,
    pub user_notified: bool,
}

/// Deadlines for the pipeline's external calls.
#[derive(Debug, Clone, Copy)]
pub struct EscalationTimeouts {
    /// Each chat platform call.
    pub platform: Duration,
    /// Each session store call.
    pub store: Duration,
}

impl Default for EscalationTimeouts {
    fn default() -> Self {
        Self {
            platform: Duration::from_secs(5),
            store: Duration::from_secs(5),
        }
    }
}

/// Drives the hand-off of one session.
pub struct EscalationPipeline {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<dyn SessionStore>,
    schema: Arc<FieldSchema>,
    handoff_chat: String,
    timeouts: EscalationTimeouts,
}

impl EscalationPipeline {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn SessionStore>,
        schema: Arc<FieldSchema>,
        handoff_chat: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            store,
            schema,
            handoff_chat: handoff_chat.into(),
            timeouts: EscalationTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: EscalationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Runs the hand-off.
    ///
    /// Only a failed summary post aborts the pipeline. Invitation, file
    /// relay, and the user notice are logged and skipped on failure.
    pub async fn run(&self, session: &Session) -> Result<EscalationReport, EscalationError> {
        let timeout = self.timeouts.platform;
        tracing::info!(
            session_key = %session.key(),
            user_id = %session.user_id(),
            mode = %session.mode(),
            files = session.files().len(),
            "starting hand-off"
        );

        let invited = if session.user_id().is_empty() {
            false
        } else {
            best_effort(
                "invite_user",
                timeout,
                self.platform.invite_user(&self.handoff_chat, session.user_id()),
            )
            .await
            .is_some()
        };

        let post = HandoffPost {
            title: render::handoff_title(session.mode()).to_string(),
            body: render::handoff_summary(session, &self.schema),
            mention: Some(session.user_id().clone()).filter(|u| !u.is_empty()),
        };
        let thread_root = with_deadline(
            "post_summary",
            timeout,
            self.platform.post_summary(&self.handoff_chat, &post),
        )
        .await
        .map_err(|e| {
            tracing::error!(session_key = %session.key(), error = %e, "failed to post case summary");
            EscalationError::SummaryPost(e)
        })?;

        let mut files_relayed = 0;
        let mut files_failed = 0;
        for file in session.files() {
            // Three calls per file, each with its own deadline.
            let relayed = best_effort("relay_file", timeout * 3, self.relay_file(&thread_root, file)).await;
            if relayed.is_some() {
                files_relayed += 1;
            } else {
                files_failed += 1;
                tracing::warn!(
                    session_key = %session.key(),
                    file_name = file.file_name.as_deref().unwrap_or(FALLBACK_FILE_NAME),
                    "file not relayed"
                );
            }
        }

        let user_notified = best_effort(
            "notify_user",
            timeout,
            self.platform.send_text(session.key(), &render::submitted_notice(invited)),
        )
        .await
        .is_some();

        with_deadline("session_clear", self.timeouts.store, self.store.clear(session.key()))
            .await
            .map_err(EscalationError::Store)?;

        let report = EscalationReport {
            thread_root,
            invited,
            files_relayed,
            files_failed,
            user_notified,
        };
        tracing::info!(
            session_key = %session.key(),
            root = %report.thread_root.message_id(),
            files_relayed,
            files_failed,
            "hand-off complete"
        );
        Ok(report)
    }

    /// Download, re-upload, and reply one file into the case thread.
    ///
    /// File keys are scoped to the chat they were sent in, so the bytes
    /// must be uploaded again to get a key valid in the hand-off chat.
    async fn relay_file(&self, root: &ThreadRoot, file: &FileAttachment) -> Result<(), PlatformError> {
        let timeout = self.timeouts.platform;

        let downloaded = with_deadline(
            "download_file",
            timeout,
            self.platform
                .download_file(&file.message_id, &file.file_key, file.kind.resource_type()),
        )
        .await?;

        let file_name = downloaded
            .file_name
            .filter(|n| !n.is_empty())
            .or_else(|| file.file_name.clone())
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        tracing::debug!(file_name = %file_name, bytes = downloaded.bytes.len(), "downloaded file");

        let file_key = with_deadline(
            "upload_file",
            timeout,
            self.platform.upload_file(&file_name, downloaded.bytes),
        )
        .await?;

        with_deadline(
            "reply_file_in_thread",
            timeout,
            self.platform.reply_file_in_thread(root, &file_key),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemorySessionStore, PlatformCall, RecordingChatPlatform};
    use crate::domain::foundation::{MessageId, SessionKey, UserId};
    use crate::domain::intake::{AttachmentKind, SessionMode};

    fn session_with_files(files: &[(&str, Option<&str>)]) -> Session {
        let mut s = Session::new(SessionKey::new("oc_user"), UserId::new("ou_1"), None);
        s.enter_mode(SessionMode::IssueReport).unwrap();
        for (i, (key, name)) in files.iter().enumerate() {
            s.record_file(FileAttachment {
                message_id: MessageId::new(format!("om_{i}")),
                file_key: key.to_string(),
                file_name: name.map(str::to_string),
                kind: AttachmentKind::File,
            });
        }
        s
    }

    fn pipeline(platform: &RecordingChatPlatform, store: &InMemorySessionStore) -> EscalationPipeline {
        EscalationPipeline::new(
            Arc::new(platform.clone()),
            Arc::new(store.clone()),
            Arc::new(FieldSchema::support_desk()),
            "oc_support",
        )
    }

    #[tokio::test]
    async fn runs_all_steps_in_order() {
        let platform = RecordingChatPlatform::new().with_file("file_a", b"aaa".to_vec(), Some("a.log"));
        let store = InMemorySessionStore::default();
        let session = session_with_files(&[("file_a", None)]);
        store.save(&session).await.unwrap();

        let report = pipeline(&platform, &store).run(&session).await.unwrap();

        assert!(report.invited);
        assert!(report.user_notified);
        assert_eq!(report.files_relayed, 1);
        assert!(store.get(session.key()).await.unwrap().is_none());

        let calls = platform.calls();
        assert!(matches!(calls[0], PlatformCall::Invite { .. }));
        assert!(matches!(calls[1], PlatformCall::PostSummary { .. }));
        assert!(matches!(calls.last(), Some(PlatformCall::SendText { .. })));

        let (post, root) = &platform.posts()[0];
        assert_eq!(post.title, "用户问题反馈 / User Issue Report");
        assert_eq!(post.mention, Some(UserId::new("ou_1")));
        assert_eq!(platform.thread_files(), vec![(root.clone(), "a.log".to_string())]);
    }

    #[tokio::test]
    async fn failed_invite_does_not_abort() {
        let platform = RecordingChatPlatform::new().failing_invite();
        let store = InMemorySessionStore::default();
        let session = session_with_files(&[]);

        let report = pipeline(&platform, &store).run(&session).await.unwrap();

        assert!(!report.invited);
        assert_eq!(platform.posts().len(), 1);
        let (_, notice) = &platform.sent_texts()[0];
        assert!(!notice.contains("技术支持群"));
    }

    #[tokio::test]
    async fn failed_post_aborts_before_files_and_clear() {
        let platform = RecordingChatPlatform::new().failing_post();
        let store = InMemorySessionStore::default();
        let session = session_with_files(&[("file_a", Some("a.log"))]);
        store.save(&session).await.unwrap();

        let err = pipeline(&platform, &store).run(&session).await.unwrap_err();

        assert!(matches!(err, EscalationError::SummaryPost(_)));
        assert!(!err.case_posted());
        assert!(platform.thread_files().is_empty());
        assert!(platform.sent_texts().is_empty());
        assert!(store.get(session.key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn file_name_falls_back_to_recorded_then_default() {
        let platform = RecordingChatPlatform::new();
        let store = InMemorySessionStore::default();
        let session = session_with_files(&[("file_a", Some("recorded.log")), ("file_b", None)]);

        pipeline(&platform, &store).run(&session).await.unwrap();

        let names: Vec<_> = platform.thread_files().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["recorded.log", "attachment"]);
    }

    #[tokio::test]
    async fn slow_download_counts_as_failed_file() {
        let platform = RecordingChatPlatform::new().with_download_delay(Duration::from_millis(200));
        let store = InMemorySessionStore::default();
        let session = session_with_files(&[("file_a", None)]);

        let report = pipeline(&platform, &store)
            .with_timeouts(EscalationTimeouts {
                platform: Duration::from_millis(20),
                store: Duration::from_secs(1),
            })
            .run(&session)
            .await
            .unwrap();

        assert_eq!(report.files_relayed, 0);
        assert_eq!(report.files_failed, 1);
        assert!(report.user_notified);
    }
}
