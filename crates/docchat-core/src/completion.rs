//! Chat completion capability and prompt assembly.
//!
//! The [`Completer`] trait is the seam for chat-completion providers; the
//! `docchat` application crate implements it for OpenAI and Ollama.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fixed system instruction placed first in every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. If excerpts are provided, rely on them and cite using [CHUNK N]. \
Do not invent citations. If a needed detail likely exists outside the excerpts, say so and ask for permission to fetch more.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

/// One message of a conversation, in the shape chat APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion capability.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Produce the assistant's reply to `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Final prompt: system instruction, optional context block as a user
/// message, then the caller's conversation unchanged.
pub fn assemble_messages(context: Option<&str>, conversation: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        messages.push(ChatMessage::user(context));
    }
    messages.extend_from_slice(conversation);
    messages
}

/// Content of the last user message, or `""` when there is none.
pub fn last_user_message(conversation: &[ChatMessage]) -> &str {
    conversation
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_with_context() {
        let conversation = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("what is the refund policy?"),
        ];
        let messages = assemble_messages(Some("CONTEXT"), &conversation);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(messages[1], ChatMessage::user("CONTEXT"));
        assert_eq!(&messages[2..], &conversation[..]);
    }

    #[test]
    fn test_assemble_without_context() {
        let conversation = vec![ChatMessage::user("hi")];
        let messages = assemble_messages(None, &conversation);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(assemble_messages(Some(""), &conversation).len(), 2);
    }

    #[test]
    fn test_last_user_message() {
        let conversation = vec![
            ChatMessage::user("first"),
            ChatMessage::user("second"),
            ChatMessage::assistant("reply"),
        ];
        assert_eq!(last_user_message(&conversation), "second");
        assert_eq!(last_user_message(&[ChatMessage::assistant("x")]), "");
        assert_eq!(last_user_message(&[]), "");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
