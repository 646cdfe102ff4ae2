//! Conversation entities and history rendering

pub mod entities;
pub mod history;

pub use entities::{
    AttachmentKind, AttachmentMeta, ChatMessage, ContentPart, Conversation, ConversationSummary,
    FileAttachment, ImageUrl, MessageContent, Role, StoredMessage, describe_attachments,
};
pub use history::{
    HistoryRole, HistoryTurn, history_to_context_text, resolve_session_id, turn_history,
};
