//! Lark/Feishu open-platform adapter: REST client and event callbacks.

mod client;
pub mod events;
mod types;

pub use client::{LarkChatPlatform, LarkConfig};
pub use events::{parse_event, token_matches, EventParseError, LarkEvent};
