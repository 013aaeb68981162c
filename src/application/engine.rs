//! Conversation engine - classifies a session, collects fields, and
//! decides when the case is ready for hand-off.
//!
//! The engine never sends anything itself. It returns an [`EngineReply`]
//! for the caller to deliver; a reply carrying the escalation marker
//! means "deliver this text, then run the hand-off pipeline".

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::foundation::ValidationError;
use crate::domain::intake::{
    merge_extraction, render, AttachmentInput, EngineInput, FieldSchema, InputClass,
    KeywordTriggers, Session, SessionMode,
};
use crate::ports::{FieldExtractor, SessionStore, StoreError};

use super::best_effort::{best_effort, with_deadline};

/// Prefix marking a reply that must be followed by a hand-off.
pub const ESCALATION_MARKER: &str = "ESCALATE:";

/// Text produced by the engine for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineReply(String);

impl EngineReply {
    /// Nothing to send.
    pub fn none() -> Self {
        Self::default()
    }

    /// A normal reply.
    pub fn message(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// A reply to deliver before running the hand-off.
    pub fn escalate(text: impl AsRef<str>) -> Self {
        Self(format!("{}{}", ESCALATION_MARKER, text.as_ref()))
    }

    /// The user-facing text if this reply triggers a hand-off.
    pub fn escalation_text(&self) -> Option<&str> {
        self.0.strip_prefix(ESCALATION_MARKER)
    }

    pub fn is_escalation(&self) -> bool {
        self.escalation_text().is_some()
    }

    /// The text to deliver, without the marker.
    pub fn text(&self) -> &str {
        self.escalation_text().unwrap_or(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// The raw reply, marker included.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors that abort processing of a message.
///
/// Extractor failures never show up here; they degrade to an empty
/// extraction.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid mode change: {0}")]
    Mode(#[from] ValidationError),
}

/// Deadlines for the engine's external calls.
#[derive(Debug, Clone, Copy)]
pub struct EngineTimeouts {
    pub extractor: Duration,
    pub store: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            extractor: Duration::from_secs(15),
            store: Duration::from_secs(5),
        }
    }
}

/// The intake state machine.
pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    extractor: Arc<dyn FieldExtractor>,
    schema: Arc<FieldSchema>,
    triggers: Arc<KeywordTriggers>,
    timeouts: EngineTimeouts,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        extractor: Arc<dyn FieldExtractor>,
        schema: Arc<FieldSchema>,
        triggers: Arc<KeywordTriggers>,
    ) -> Self {
        Self {
            store,
            extractor,
            schema,
            triggers,
            timeouts: EngineTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: EngineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Processes one message against a session and persists the result.
    ///
    /// Blank text is ignored without touching the session.
    pub async fn process(&self, session: &mut Session, input: &EngineInput) -> Result<EngineReply, EngineError> {
        match input {
            EngineInput::Attachment(attachment) => self.handle_attachment(session, attachment).await,
            EngineInput::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(EngineReply::none());
                }

                let class = if self.triggers.is_suggestion(trimmed) {
                    InputClass::SuggestionText
                } else {
                    InputClass::OtherText
                };
                self.classify(session, class)?;

                match session.mode() {
                    SessionMode::Suggestion => self.handle_suggestion(session, trimmed).await,
                    _ => self.collect(session, text).await,
                }
            }
        }
    }

    fn classify(&self, session: &mut Session, class: InputClass) -> Result<(), EngineError> {
        let before = session.mode();
        let after = before.next(class);
        session.enter_mode(after)?;
        if before != after {
            tracing::info!(session_key = %session.key(), mode = %after, "session classified");
        }
        Ok(())
    }

    async fn handle_attachment(
        &self,
        session: &mut Session,
        attachment: &AttachmentInput,
    ) -> Result<EngineReply, EngineError> {
        if let Some(file) = attachment.to_file_attachment() {
            tracing::debug!(
                session_key = %session.key(),
                file_name = file.file_name.as_deref().unwrap_or(""),
                "recorded attachment"
            );
            session.record_file(file);
        }
        session.append_user_message(attachment.describe());
        self.classify(session, InputClass::NonText)?;

        if session.mode() == SessionMode::Suggestion {
            let reply = render::suggestion_ack(session, &self.schema);
            return self.finish(session, EngineReply::escalate(reply)).await;
        }

        if session.is_complete(&self.schema) {
            let reply = render::completion(session, &self.schema);
            return self.finish(session, EngineReply::escalate(reply)).await;
        }

        let missing = session.missing_fields(&self.schema);
        let reply = render::file_received(&missing, self.triggers.escalation_hint());
        self.finish(session, EngineReply::message(reply)).await
    }

    async fn handle_suggestion(&self, session: &mut Session, text: &str) -> Result<EngineReply, EngineError> {
        session.set_suggestion(text);
        session.append_user_message(text);

        let reply = render::suggestion_ack(session, &self.schema);
        self.finish(session, EngineReply::escalate(reply)).await
    }

    async fn collect(&self, session: &mut Session, text: &str) -> Result<EngineReply, EngineError> {
        session.append_user_message(text);
        let snapshot = session.collected().clone();

        let extracted = best_effort(
            "extract_fields",
            self.timeouts.extractor,
            self.extractor.extract(text, &snapshot),
        )
        .await
        .unwrap_or_default();

        let changes = merge_extraction(session, &self.schema, &extracted);
        for change in &changes {
            tracing::debug!(session_key = %session.key(), field = %change.key, kind = ?change.kind, "field merged");
        }

        if session.is_complete(&self.schema) {
            let reply = render::completion(session, &self.schema);
            return self.finish(session, EngineReply::escalate(reply)).await;
        }

        let reply = if changes.is_empty() && session.messages().len() <= 2 {
            render::welcome(&self.schema)
        } else {
            let missing = session.missing_fields(&self.schema);
            render::progress(&changes, &missing, self.triggers.escalation_hint())
        };
        self.finish(session, EngineReply::message(reply)).await
    }

    /// Logs the reply in the session and persists it.
    async fn finish(&self, session: &mut Session, reply: EngineReply) -> Result<EngineReply, EngineError> {
        session.append_assistant_message(reply.text());
        with_deadline("session_save", self.timeouts.store, self.store.save(session)).await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::extractor::MockFieldExtractor;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::domain::foundation::{MessageId, SessionKey, UserId};
    use crate::domain::intake::{ExtractedFields, FieldDescriptor, MessageKind};
    use crate::ports::ExtractionError;

    fn schema() -> Arc<FieldSchema> {
        Arc::new(
            FieldSchema::new(vec![
                FieldDescriptor::required("a", "Alpha"),
                FieldDescriptor::required("b", "Beta"),
            ])
            .unwrap(),
        )
    }

    fn engine(extractor: MockFieldExtractor) -> (ConversationEngine, InMemorySessionStore) {
        let store = InMemorySessionStore::default();
        let engine = ConversationEngine::new(
            Arc::new(store.clone()),
            Arc::new(extractor),
            schema(),
            Arc::new(KeywordTriggers::default()),
        );
        (engine, store)
    }

    fn session() -> Session {
        Session::new(SessionKey::new("oc_1"), UserId::new("ou_1"), None)
    }

    fn text(s: &str) -> EngineInput {
        EngineInput::Text(s.to_string())
    }

    #[test]
    fn reply_marker_round_trip() {
        let reply = EngineReply::escalate("done");
        assert_eq!(reply.as_str(), "ESCALATE:done");
        assert_eq!(reply.escalation_text(), Some("done"));
        assert_eq!(reply.text(), "done");

        let plain = EngineReply::message("hi");
        assert_eq!(plain.escalation_text(), None);
        assert_eq!(plain.text(), "hi");
        assert!(EngineReply::none().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_ignored() {
        let (engine, store) = engine(MockFieldExtractor::new());
        let mut s = session();
        let before = s.clone();

        let reply = engine.process(&mut s, &text("   \n")).await.unwrap();

        assert!(reply.is_empty());
        assert_eq!(s, before);
        assert!(store.get(s.key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_message_without_fields_gets_welcome() {
        let (engine, store) = engine(MockFieldExtractor::new());
        let mut s = session();

        let reply = engine.process(&mut s, &text("hello")).await.unwrap();

        assert!(!reply.is_escalation());
        assert!(reply.text().starts_with("您好"));
        assert_eq!(s.mode(), SessionMode::IssueReport);
        assert_eq!(s.messages().len(), 2);
        assert!(store.get(s.key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn later_message_without_fields_asks_to_continue() {
        let (engine, _) = engine(MockFieldExtractor::new());
        let mut s = session();
        engine.process(&mut s, &text("hello")).await.unwrap();

        let reply = engine.process(&mut s, &text("still there?")).await.unwrap();
        assert!(reply.text().starts_with("请继续提供以下信息："));
    }

    #[tokio::test]
    async fn collects_then_escalates_when_complete() {
        let extractor = MockFieldExtractor::new()
            .with_result(ExtractedFields::new().with("a", "v1"))
            .with_result(ExtractedFields::new().with("b", "x"));
        let (engine, _) = engine(extractor.clone());
        let mut s = session();

        let first = engine.process(&mut s, &text("a is v1")).await.unwrap();
        assert!(!first.is_escalation());
        assert!(first.text().contains("已记录：Alpha: v1"));
        assert!(first.text().contains("- Beta"));

        let second = engine.process(&mut s, &text("b is x")).await.unwrap();
        assert!(second.is_escalation());
        assert!(second.text().starts_with("信息收集完毕！"));
        assert!(s.is_complete(engine.schema()));

        let calls = extractor.calls();
        assert_eq!(calls[1].1.get("a"), Some("v1"));
    }

    #[tokio::test]
    async fn extractor_failure_does_not_block() {
        let extractor = MockFieldExtractor::new().with_error(ExtractionError::Unavailable("down".into()));
        let (engine, _) = engine(extractor);
        let mut s = session();

        let reply = engine.process(&mut s, &text("hello")).await.unwrap();
        assert!(!reply.is_escalation());
        assert!(s.collected().is_empty());
    }

    #[tokio::test]
    async fn slow_extractor_is_cut_off() {
        let extractor = MockFieldExtractor::new()
            .with_result(ExtractedFields::new().with("a", "late"))
            .with_delay(Duration::from_millis(200));
        let (engine, _) = engine(extractor);
        let engine = engine.with_timeouts(EngineTimeouts {
            extractor: Duration::from_millis(10),
            store: Duration::from_secs(1),
        });
        let mut s = session();

        engine.process(&mut s, &text("a is late")).await.unwrap();
        assert!(s.collected().is_empty());
    }

    #[tokio::test]
    async fn suggestion_escalates_immediately() {
        let extractor = MockFieldExtractor::new();
        let (engine, _) = engine(extractor.clone());
        let mut s = session();

        let reply = engine
            .process(&mut s, &text("feedback: the button is broken"))
            .await
            .unwrap();

        assert!(reply.is_escalation());
        assert_eq!(s.mode(), SessionMode::Suggestion);
        assert_eq!(s.suggestion_text(), Some("feedback: the button is broken"));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn suggestion_prefix_after_classification_is_collected() {
        let (engine, _) = engine(MockFieldExtractor::new());
        let mut s = session();
        engine.process(&mut s, &text("hello")).await.unwrap();

        let reply = engine.process(&mut s, &text("feedback: later")).await.unwrap();
        assert!(!reply.is_escalation());
        assert_eq!(s.mode(), SessionMode::IssueReport);
        assert_eq!(s.suggestion_text(), None);
    }

    #[tokio::test]
    async fn file_message_is_recorded() {
        let (engine, _) = engine(MockFieldExtractor::new());
        let mut s = session();
        let input = EngineInput::Attachment(AttachmentInput {
            message_id: MessageId::new("om_f"),
            kind: MessageKind::File,
            file_key: Some("file_1".into()),
            file_name: Some("app.log".into()),
        });

        let reply = engine.process(&mut s, &input).await.unwrap();

        assert!(reply.text().starts_with("收到文件，已记录。"));
        assert_eq!(s.mode(), SessionMode::IssueReport);
        assert_eq!(s.files().len(), 1);
        assert_eq!(s.messages()[0].text, "上传了文件: app.log");
    }

    #[tokio::test]
    async fn file_on_complete_session_escalates() {
        let extractor = MockFieldExtractor::new().with_result(ExtractedFields::new().with("a", "1"));
        let (engine, _) = engine(extractor);
        let mut s = session();
        engine.process(&mut s, &text("a=1")).await.unwrap();
        s.set_field(engine.schema().get("b").unwrap(), "2");

        let input = EngineInput::Attachment(AttachmentInput {
            message_id: MessageId::new("om_f"),
            kind: MessageKind::Image,
            file_key: Some("img_1".into()),
            file_name: None,
        });
        let reply = engine.process(&mut s, &input).await.unwrap();
        assert!(reply.is_escalation());
        assert!(reply.text().contains("日志文件 / Log files"));
    }
}
