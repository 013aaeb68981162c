//! Parsing Lark event callbacks into inbound messages.
//!
//! Only schema 2.0 plaintext callbacks are understood. Encrypted payloads
//! are rejected.

use serde::Deserialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{MessageId, SessionKey, UserId};
use crate::domain::intake::{ChannelKind, InboundMessage, MessageKind};

pub const MESSAGE_RECEIVE: &str = "im.message.receive_v1";

/// A parsed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LarkEvent {
    /// Endpoint ownership check; echo the challenge back.
    Challenge { challenge: String, token: Option<String> },
    /// A message sent to the bot.
    Message { token: Option<String>, message: InboundMessage },
    /// Any other event type, acknowledged and ignored.
    Other { token: Option<String>, event_type: String },
}

impl LarkEvent {
    /// Verification token carried by the callback.
    pub fn token(&self) -> Option<&str> {
        match self {
            LarkEvent::Challenge { token, .. }
            | LarkEvent::Message { token, .. }
            | LarkEvent::Other { token, .. } => token.as_deref(),
        }
    }
}

/// Errors parsing a callback body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("malformed event body: {0}")]
    Malformed(String),

    #[error("encrypted events are not supported")]
    Encrypted,

    #[error("message event missing {0}")]
    MissingField(&'static str),
}

/// Compares the configured verification token with the one received.
///
/// With no token configured every callback is accepted.
pub fn token_matches(expected: Option<&str>, received: Option<&str>) -> bool {
    match (expected, received) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(expected), Some(received)) => bool::from(expected.as_bytes().ct_eq(received.as_bytes())),
    }
}

#[derive(Debug, Deserialize)]
struct RawCallback {
    #[serde(rename = "type")]
    kind: Option<String>,
    challenge: Option<String>,
    token: Option<String>,
    encrypt: Option<String>,
    header: Option<RawHeader>,
    event: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    event_type: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessageEvent {
    sender: RawSender,
    message: RawMessage,
}

#[derive(Debug, Deserialize)]
struct RawSender {
    sender_id: RawSenderId,
}

#[derive(Debug, Default, Deserialize)]
struct RawSenderId {
    #[serde(default)]
    open_id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message_id: String,
    chat_id: String,
    chat_type: String,
    message_type: String,
    #[serde(default)]
    content: String,
}

/// Parses a callback body.
pub fn parse_event(body: &[u8]) -> Result<LarkEvent, EventParseError> {
    let raw: RawCallback =
        serde_json::from_slice(body).map_err(|e| EventParseError::Malformed(e.to_string()))?;

    if raw.encrypt.is_some() {
        return Err(EventParseError::Encrypted);
    }

    if raw.kind.as_deref() == Some("url_verification") {
        let challenge = raw.challenge.ok_or(EventParseError::MissingField("challenge"))?;
        return Ok(LarkEvent::Challenge {
            challenge,
            token: raw.token,
        });
    }

    let header = raw.header.ok_or(EventParseError::MissingField("header"))?;
    if header.event_type != MESSAGE_RECEIVE {
        return Ok(LarkEvent::Other {
            token: header.token,
            event_type: header.event_type,
        });
    }

    let event = raw.event.ok_or(EventParseError::MissingField("event"))?;
    let event: RawMessageEvent =
        serde_json::from_value(event).map_err(|e| EventParseError::Malformed(e.to_string()))?;

    Ok(LarkEvent::Message {
        token: header.token,
        message: to_inbound(event)?,
    })
}

fn to_inbound(event: RawMessageEvent) -> Result<InboundMessage, EventParseError> {
    let RawMessageEvent { sender, message } = event;
    if message.message_id.is_empty() {
        return Err(EventParseError::MissingField("message_id"));
    }
    if message.chat_id.is_empty() {
        return Err(EventParseError::MissingField("chat_id"));
    }

    let kind = MessageKind::parse(&message.message_type);
    let content: Value = serde_json::from_str(&message.content).unwrap_or(Value::Null);
    let field = |name: &str| {
        content
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let (text, file_key, file_name) = match kind {
        MessageKind::Text => (field("text").unwrap_or_default(), None, None),
        MessageKind::Image => (String::new(), field("image_key"), None),
        _ => (String::new(), field("file_key"), field("file_name")),
    };

    Ok(InboundMessage {
        session_key: SessionKey::new(message.chat_id),
        sender: UserId::new(sender.sender_id.open_id),
        sender_name: None,
        message_id: MessageId::new(message.message_id),
        channel: ChannelKind::parse(&message.chat_type),
        kind,
        text,
        file_key,
        file_name,
    })
}
