//! Intake domain - field schema, session aggregate, merge rules, and the
//! texts rendered from them.

mod input;
mod merge;
mod mode;
pub mod render;
mod schema;
mod session;
mod triggers;

pub use input::{AttachmentInput, ChannelKind, EngineInput, InboundMessage, MessageKind};
pub use merge::{merge_extraction, normalize_value, ChangeKind, ExtractedFields, FieldChange};
pub use mode::{InputClass, SessionMode};
pub use schema::{support_desk_fields, FieldDescriptor, FieldSchema};
pub use session::{
    AttachmentKind, ChatMessage, CollectedFields, FileAttachment, MessageRole, Session,
};
pub use triggers::KeywordTriggers;
