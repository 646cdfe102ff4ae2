//! Prior-turn history extraction and compact context rendering

use super::entities::{Conversation, StoredMessage};

const HISTORY_CONTEXT_MAX_CHARS: usize = 5000;

/// One prior turn as seen by the council prompts
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Assistant,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: content.into(),
        }
    }
}

/// Derive the prior-turn history from stored messages.
///
/// User turns contribute their content; assistant turns contribute the
/// chairman's synthesized response. Blank turns are skipped.
pub fn turn_history(messages: &[StoredMessage]) -> Vec<HistoryTurn> {
    messages
        .iter()
        .filter_map(|message| match message {
            StoredMessage::User { content, .. } => {
                let content = content.trim();
                (!content.is_empty()).then(|| HistoryTurn::user(content))
            }
            StoredMessage::Assistant { stage3, .. } => {
                let content = stage3.response.trim();
                (!content.is_empty()).then(|| HistoryTurn::assistant(content))
            }
        })
        .collect()
}

/// Render history into compact `User:`/`Assistant:` text blocks.
///
/// The rendered text is tail-truncated to the last 5000 characters with a
/// `...` prefix so the most recent turns survive.
pub fn history_to_context_text(history: &[HistoryTurn]) -> String {
    let lines: Vec<String> = history
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| {
            let label = match turn.role {
                HistoryRole::User => "User",
                HistoryRole::Assistant => "Assistant",
            };
            format!("{}: {}", label, turn.content.trim())
        })
        .collect();

    let context = lines.join("\n\n");
    if context.len() <= HISTORY_CONTEXT_MAX_CHARS {
        return context;
    }

    let tail_start = context.len() - HISTORY_CONTEXT_MAX_CHARS;
    // Cut on a char boundary at or after the byte offset
    let mut start = tail_start;
    while !context.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &context[start..])
}

/// Resolve the session correlation id for the next turn of a conversation:
/// the last stored message's session id, else the conversation id, else a
/// freshly generated id.
pub fn resolve_session_id(conversation: &Conversation) -> String {
    if let Some(session_id) = conversation
        .messages
        .iter()
        .rev()
        .find_map(|m| m.session_id())
        && !session_id.trim().is_empty()
    {
        return session_id.trim().to_string();
    }

    if !conversation.id.trim().is_empty() {
        return conversation.id.trim().to_string();
    }

    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::results::Stage3Synthesis;
    use crate::usage::{CallUsage, UsageSummary};
    use crate::Model;
    use chrono::Utc;

    fn conversation(messages: Vec<StoredMessage>) -> Conversation {
        Conversation {
            id: "conv-1".to_string(),
            owner_id: "acct-1".to_string(),
            created_at: Utc::now(),
            title: "New Conversation".to_string(),
            archived: false,
            messages,
            usage: UsageSummary::empty(),
        }
    }

    fn assistant_message(response: &str, session_id: Option<&str>) -> StoredMessage {
        StoredMessage::Assistant {
            stage1: vec![],
            stage2: vec![],
            stage3: Stage3Synthesis::new(Model::Gemini3Pro, response, CallUsage::zero()),
            session_id: session_id.map(String::from),
        }
    }

    #[test]
    fn test_turn_history_maps_roles() {
        let history = turn_history(&[
            StoredMessage::User {
                content: "What is Rust?".to_string(),
                attachments: vec![],
                session_id: None,
            },
            assistant_message("A systems language.", None),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], HistoryTurn::user("What is Rust?"));
        assert_eq!(history[1], HistoryTurn::assistant("A systems language."));
    }

    #[test]
    fn test_context_text_truncates_to_tail() {
        let long = "x".repeat(6000);
        let context = history_to_context_text(&[HistoryTurn::user(long)]);
        assert!(context.starts_with("..."));
        assert_eq!(context.len(), 5003);
    }

    #[test]
    fn test_resolve_session_id_prefers_last_message() {
        let conv = conversation(vec![
            assistant_message("a", Some("sess-old")),
            assistant_message("b", Some("sess-new")),
        ]);
        assert_eq!(resolve_session_id(&conv), "sess-new");
    }

    #[test]
    fn test_resolve_session_id_falls_back_to_conversation_id() {
        let conv = conversation(vec![assistant_message("a", None)]);
        assert_eq!(resolve_session_id(&conv), "conv-1");
    }

    #[test]
    fn test_resolve_session_id_generates_when_all_blank() {
        let mut conv = conversation(vec![]);
        conv.id = "  ".to_string();
        let id = resolve_session_id(&conv);
        assert!(!id.trim().is_empty());
    }
}
