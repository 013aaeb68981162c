//! Shared wiring for integration tests: in-memory stores, a recording
//! chat platform, and a scripted extractor behind a real dispatcher.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use intake_relay::adapters::extractor::MockFieldExtractor;
use intake_relay::adapters::memory::{InMemoryMessageDeduper, InMemorySessionStore, RecordingChatPlatform};
use intake_relay::application::{ConversationEngine, EscalationPipeline, InboundDispatcher, SessionLocks};
use intake_relay::domain::foundation::{MessageId, SessionKey, UserId};
use intake_relay::domain::intake::{
    ChannelKind, FieldDescriptor, FieldSchema, InboundMessage, KeywordTriggers, MessageKind,
};
use intake_relay::ports::FieldExtractor;

pub const USER_CHAT: &str = "oc_user";
pub const SUPPORT_CHAT: &str = "oc_support";

pub struct TestApp {
    pub dispatcher: Arc<InboundDispatcher>,
    pub platform: RecordingChatPlatform,
    pub store: InMemorySessionStore,
}

pub struct TestAppBuilder {
    schema: FieldSchema,
    extractor: Arc<dyn FieldExtractor>,
    platform: RecordingChatPlatform,
    deduper: InMemoryMessageDeduper,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            schema: two_field_schema(),
            extractor: Arc::new(MockFieldExtractor::new()),
            platform: RecordingChatPlatform::new(),
            deduper: InMemoryMessageDeduper::default(),
        }
    }

    pub fn extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn platform(mut self, platform: RecordingChatPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn dedup_ttl(mut self, ttl: Duration) -> Self {
        self.deduper = InMemoryMessageDeduper::new(ttl);
        self
    }

    pub fn build(self) -> TestApp {
        let schema = Arc::new(self.schema);
        let triggers = Arc::new(KeywordTriggers::default());
        let store = InMemorySessionStore::default();

        let engine = ConversationEngine::new(
            Arc::new(store.clone()),
            self.extractor,
            Arc::clone(&schema),
            Arc::clone(&triggers),
        );
        let pipeline = EscalationPipeline::new(
            Arc::new(self.platform.clone()),
            Arc::new(store.clone()),
            schema,
            SUPPORT_CHAT,
        );
        let dispatcher = InboundDispatcher::new(
            Arc::new(self.deduper),
            Arc::new(SessionLocks::new(Duration::from_secs(60))),
            Arc::new(store.clone()),
            Arc::new(engine),
            Arc::new(pipeline),
            Arc::new(self.platform.clone()),
            triggers,
        );

        TestApp {
            dispatcher: Arc::new(dispatcher),
            platform: self.platform,
            store,
        }
    }
}

/// Schema requiring fields `a` (Alpha) and `b` (Beta).
pub fn two_field_schema() -> FieldSchema {
    FieldSchema::new(vec![
        FieldDescriptor::required("a", "Alpha"),
        FieldDescriptor::required("b", "Beta"),
    ])
    .expect("valid schema")
}

pub fn text(chat: &str, id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        session_key: SessionKey::new(chat),
        sender: UserId::new("ou_1"),
        sender_name: Some("Tester".to_string()),
        message_id: MessageId::new(id),
        channel: ChannelKind::Private,
        kind: MessageKind::Text,
        text: body.to_string(),
        file_key: None,
        file_name: None,
    }
}

pub fn file(chat: &str, id: &str, file_key: &str, file_name: &str) -> InboundMessage {
    InboundMessage {
        kind: MessageKind::File,
        text: String::new(),
        file_key: Some(file_key.to_string()),
        file_name: Some(file_name.to_string()),
        ..text(chat, id, "")
    }
}
