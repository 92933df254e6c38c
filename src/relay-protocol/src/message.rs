//! Chat message types shared between the session state machine and its
//! observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
    Thinking,
    Error,
}

impl MessageRole {
    /// Human-readable label used when serializing history lines.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::Tool => "Tool",
            MessageRole::Thinking => "Thinking",
            MessageRole::Error => "Error",
        }
    }
}

/// A single message in a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message ID.
    pub id: String,

    /// Message role.
    pub role: MessageRole,

    /// Message content.
    pub content: String,

    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Tool name, set for assistant messages that carry a tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tool input payload, set alongside `tool_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,

    /// Tool use ID linking a tool call to its result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,

    /// Whether this message represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    /// Create a message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_name: None,
            tool_input: None,
            tool_use_id: None,
            is_error: false,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create an assistant message carrying a tool call.
    pub fn tool_call(
        tool_name: impl Into<String>,
        input: serde_json::Value,
        tool_use_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            tool_input: Some(input),
            tool_use_id: Some(tool_use_id.into()),
            ..Self::new(MessageRole::Assistant, String::new())
        }
    }

    /// Create a tool-result message.
    pub fn tool_result(content: impl Into<String>, tool_use_id: impl Into<String>, is_error: bool) -> Self {
        Self {
            tool_use_id: Some(tool_use_id.into()),
            is_error,
            ..Self::new(MessageRole::Tool, content)
        }
    }

    /// Create a thinking message.
    pub fn thinking(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Thinking, content)
    }

    /// Create an error message.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(MessageRole::Error, content)
        }
    }

    /// Whether this is an assistant message without a tool call, i.e. plain
    /// streamed text that later text events may merge into.
    pub fn is_plain_assistant(&self) -> bool {
        self.role == MessageRole::Assistant && self.tool_name.is_none()
    }
}
