//! Session aggregate - the persisted record of one intake conversation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::mode::SessionMode;
use super::schema::{FieldDescriptor, FieldSchema};
use crate::domain::foundation::{MessageId, SessionKey, StateMachine, Timestamp, UserId, ValidationError};

/// Author of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry of the append-only message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: Timestamp,
}

/// Kind of relayable attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Image,
    Audio,
    Video,
}

impl AttachmentKind {
    /// Resource type used when downloading the attachment from its message.
    pub fn resource_type(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            _ => "file",
        }
    }
}

/// A file the user sent, recorded in arrival order for later relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Message the file arrived in; needed to download it.
    pub message_id: MessageId,
    /// Platform file reference, only valid in the originating chat.
    pub file_key: String,
    #[serde(default)]
    pub file_name: Option<String>,
    pub kind: AttachmentKind,
}

/// Collected field values keyed by schema key.
///
/// A key is never stored with an empty value: absence means "not yet
/// collected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedFields(BTreeMap<String, String>);

impl CollectedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for a key, if collected.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if the key has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over collected pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stores a value, returning the previous one. Blank values are ignored.
    fn set(&mut self, key: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return self.0.get(key).cloned();
        }
        self.0.insert(key.to_string(), value.to_string())
    }
}

/// One ongoing intake conversation, keyed by chat identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    key: SessionKey,
    user_id: UserId,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mode: SessionMode,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    collected: CollectedFields,
    #[serde(default)]
    files: Vec<FileAttachment>,
    #[serde(default)]
    suggestion_text: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Creates an empty session in `Unspecified` mode.
    pub fn new(key: SessionKey, user_id: UserId, display_name: Option<String>) -> Self {
        let now = Timestamp::now();
        Self {
            key,
            user_id,
            display_name,
            mode: SessionMode::Unspecified,
            messages: Vec::new(),
            collected: CollectedFields::new(),
            files: Vec::new(),
            suggestion_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn collected(&self) -> &CollectedFields {
        &self.collected
    }

    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn suggestion_text(&self) -> Option<&str> {
        self.suggestion_text.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Updates the mutable identity fields of an existing session.
    ///
    /// An empty user id or a missing display name keeps the stored value.
    pub fn refresh_identity(&mut self, user_id: UserId, display_name: Option<String>) {
        if !user_id.is_empty() && user_id != self.user_id {
            self.user_id = user_id;
            self.touch();
        }
        if display_name.is_some() && display_name != self.display_name {
            self.display_name = display_name;
            self.touch();
        }
    }

    pub fn append_user_message(&mut self, text: impl Into<String>) {
        self.append(MessageRole::User, text.into());
    }

    pub fn append_assistant_message(&mut self, text: impl Into<String>) {
        self.append(MessageRole::Assistant, text.into());
    }

    fn append(&mut self, role: MessageRole, text: String) {
        self.messages.push(ChatMessage {
            role,
            text,
            timestamp: Timestamp::now(),
        });
        self.touch();
    }

    /// Records an attachment for relay at hand-off time.
    pub fn record_file(&mut self, file: FileAttachment) {
        self.files.push(file);
        self.touch();
    }

    /// Stores a value for a schema field, returning the previous value.
    ///
    /// Blank values never overwrite or erase a collected value.
    pub fn set_field(&mut self, field: &FieldDescriptor, value: &str) -> Option<String> {
        let previous = self.collected.set(&field.key, value);
        self.touch();
        previous
    }

    /// True when every required field of the schema has a value.
    pub fn is_complete(&self, schema: &FieldSchema) -> bool {
        schema.required().all(|f| self.collected.contains(&f.key))
    }

    /// Required fields without a value, in schema order.
    pub fn missing_fields<'a>(&self, schema: &'a FieldSchema) -> Vec<&'a FieldDescriptor> {
        schema
            .required()
            .filter(|f| !self.collected.contains(&f.key))
            .collect()
    }

    /// Moves the session into a classified mode.
    ///
    /// Entering the current mode again is a no-op; any other transition
    /// out of a classified mode is rejected.
    pub fn enter_mode(&mut self, target: SessionMode) -> Result<(), ValidationError> {
        if self.mode == target {
            return Ok(());
        }
        self.mode = self.mode.transition_to(target)?;
        self.touch();
        Ok(())
    }

    /// Stores the verbatim suggestion content.
    pub fn set_suggestion(&mut self, text: impl Into<String>) {
        self.suggestion_text = Some(text.into());
        self.touch();
    }

    /// Refreshes `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
