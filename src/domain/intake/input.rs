//! Inbound message model, independent of any chat platform's wire format.

use crate::domain::foundation::{MessageId, SessionKey, UserId};

use super::session::{AttachmentKind, FileAttachment};

/// Channel the message arrived in. Only private chats are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    Private,
    Group,
    Other(String),
}

impl ChannelKind {
    /// Maps a platform chat-type discriminator.
    pub fn parse(value: &str) -> Self {
        match value {
            "p2p" => ChannelKind::Private,
            "group" => ChannelKind::Group,
            other => ChannelKind::Other(other.to_string()),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, ChannelKind::Private)
    }
}

/// Message-type discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    File,
    Image,
    Audio,
    Video,
    Sticker,
    Other(String),
}

impl MessageKind {
    /// Maps a platform message-type discriminator.
    pub fn parse(value: &str) -> Self {
        match value {
            "text" => MessageKind::Text,
            "file" => MessageKind::File,
            "image" => MessageKind::Image,
            "audio" => MessageKind::Audio,
            "media" | "video" => MessageKind::Video,
            "sticker" => MessageKind::Sticker,
            other => MessageKind::Other(other.to_string()),
        }
    }

    /// Attachment kind for message types that carry a relayable file.
    pub fn attachment_kind(&self) -> Option<AttachmentKind> {
        match self {
            MessageKind::File => Some(AttachmentKind::File),
            MessageKind::Image => Some(AttachmentKind::Image),
            MessageKind::Audio => Some(AttachmentKind::Audio),
            MessageKind::Video => Some(AttachmentKind::Video),
            _ => None,
        }
    }
}

/// One inbound chat event, already parsed from the platform payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub session_key: SessionKey,
    pub sender: UserId,
    pub sender_name: Option<String>,
    pub message_id: MessageId,
    pub channel: ChannelKind,
    pub kind: MessageKind,
    /// Text content; empty for non-text messages.
    pub text: String,
    pub file_key: Option<String>,
    pub file_name: Option<String>,
}

impl InboundMessage {
    /// Converts the message into engine input.
    pub fn to_engine_input(&self) -> EngineInput {
        match self.kind {
            MessageKind::Text => EngineInput::Text(self.text.clone()),
            _ => EngineInput::Attachment(AttachmentInput {
                message_id: self.message_id.clone(),
                kind: self.kind.clone(),
                file_key: self.file_key.clone().filter(|k| !k.is_empty()),
                file_name: self.file_name.clone().filter(|n| !n.is_empty()),
            }),
        }
    }
}

/// Input handed to the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInput {
    Text(String),
    Attachment(AttachmentInput),
}

/// A non-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInput {
    pub message_id: MessageId,
    pub kind: MessageKind,
    pub file_key: Option<String>,
    pub file_name: Option<String>,
}

impl AttachmentInput {
    /// Synthetic log text standing in for the attachment.
    pub fn describe(&self) -> String {
        match (&self.kind, &self.file_name) {
            (MessageKind::File, Some(name)) => format!("上传了文件: {name}"),
            (MessageKind::File, None) => "上传了文件".to_string(),
            (MessageKind::Image, _) => "[图片]".to_string(),
            (MessageKind::Audio, _) => "[语音]".to_string(),
            (MessageKind::Video, _) => "[视频]".to_string(),
            (MessageKind::Sticker, _) => "[表情包]".to_string(),
            (MessageKind::Text, _) => String::new(),
            (MessageKind::Other(kind), _) => format!("[{kind}]"),
        }
    }

    /// File metadata worth relaying, if the message carries a file key.
    pub fn to_file_attachment(&self) -> Option<FileAttachment> {
        let kind = self.kind.attachment_kind()?;
        let file_key = self.file_key.clone()?;
        Some(FileAttachment {
            message_id: self.message_id.clone(),
            file_key,
            file_name: self.file_name.clone(),
            kind,
        })
    }
}
