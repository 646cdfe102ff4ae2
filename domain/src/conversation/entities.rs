//! Conversation entities - chat messages, attachments, persisted records.
//!
//! Persisted message payloads are explicit tagged variants discriminated by
//! `role` (user | assistant) rather than loose JSON; the persistence boundary
//! validates rows into [`StoredMessage`] when loading a conversation.

use crate::council::results::{Stage1Response, Stage2Ranking, Stage3Synthesis};
use crate::usage::UsageSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message role in a model conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message sent to a model backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user turn carrying text plus attachment parts
    pub fn user_with_parts(text: impl Into<String>, attachments: &[ContentPart]) -> Self {
        let mut parts = vec![ContentPart::Text { text: text.into() }];
        parts.extend(attachments.iter().cloned());
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message content: plain text or multipart (text + attachments)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multipart user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    File { file: FileAttachment },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub file_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Compact attachment summary for stage-1 prompt text: named files first,
/// then counts of unnamed files and images. Empty when nothing is attached.
pub fn describe_attachments(attachments: &[ContentPart]) -> String {
    let mut named_files: Vec<&str> = Vec::new();
    let mut unnamed_files = 0usize;
    let mut images = 0usize;

    for part in attachments {
        match part {
            ContentPart::File { file } => match file.filename.as_deref() {
                Some(name) if !name.trim().is_empty() => {
                    let name = name.trim();
                    if !named_files.contains(&name) {
                        named_files.push(name);
                    }
                }
                _ => unnamed_files += 1,
            },
            ContentPart::ImageUrl { .. } => images += 1,
            ContentPart::Text { .. } => {}
        }
    }

    let mut parts: Vec<String> = Vec::new();
    if !named_files.is_empty() {
        let shown: Vec<&str> = named_files.into_iter().take(6).collect();
        parts.push(format!("Named files: {}.", shown.join(", ")));
    }
    if unnamed_files > 0 {
        parts.push(format!("Additional file attachments: {}.", unnamed_files));
    }
    if images > 0 {
        parts.push(format!("Image attachments: {}.", images));
    }

    parts.join(" ")
}

/// Attachment metadata persisted alongside a user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub kind: AttachmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    File,
    Image,
}

impl AttachmentMeta {
    /// Extract persistable metadata from raw attachment parts.
    pub fn from_parts(attachments: &[ContentPart]) -> Vec<AttachmentMeta> {
        attachments
            .iter()
            .filter_map(|part| match part {
                ContentPart::File { file } => Some(AttachmentMeta {
                    kind: AttachmentKind::File,
                    filename: file.filename.clone(),
                }),
                ContentPart::ImageUrl { .. } => Some(AttachmentMeta {
                    kind: AttachmentKind::Image,
                    filename: None,
                }),
                ContentPart::Text { .. } => None,
            })
            .collect()
    }
}

/// A persisted conversation message, discriminated by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum StoredMessage {
    User {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<AttachmentMeta>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Assistant {
        stage1: Vec<Stage1Response>,
        stage2: Vec<Stage2Ranking>,
        stage3: Stage3Synthesis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl StoredMessage {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            StoredMessage::User { session_id, .. }
            | StoredMessage::Assistant { session_id, .. } => session_id.as_deref(),
        }
    }
}

/// A conversation with its full message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub archived: bool,
    pub messages: Vec<StoredMessage>,
    #[serde(default)]
    pub usage: UsageSummary,
}

/// Conversation metadata for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub archived: bool,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_part(name: Option<&str>) -> ContentPart {
        ContentPart::File {
            file: FileAttachment {
                filename: name.map(String::from),
                file_data: "data:application/pdf;base64,AAAA".to_string(),
            },
        }
    }

    #[test]
    fn test_describe_attachments_empty() {
        assert_eq!(describe_attachments(&[]), "");
    }

    #[test]
    fn test_describe_attachments_mixed() {
        let parts = vec![
            file_part(Some("report.pdf")),
            file_part(Some("report.pdf")),
            file_part(None),
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,BBBB".to_string(),
                },
            },
        ];
        let summary = describe_attachments(&parts);
        assert_eq!(
            summary,
            "Named files: report.pdf. Additional file attachments: 1. Image attachments: 1."
        );
    }

    #[test]
    fn test_stored_message_role_tag() {
        let message = StoredMessage::User {
            content: "hello".to_string(),
            attachments: vec![],
            session_id: Some("s-1".to_string()),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");

        let back: StoredMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_stored_message_rejects_unknown_role() {
        let raw = serde_json::json!({"role": "moderator", "content": "x"});
        assert!(serde_json::from_value::<StoredMessage>(raw).is_err());
    }
}
