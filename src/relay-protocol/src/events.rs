//! Structured events emitted by a running agent process.
//!
//! Agents write one JSON event per line; each event names its session and
//! carries a kind-specific payload. The session state machine in
//! `relay-session` consumes these strictly in arrival order.

use serde::{Deserialize, Serialize};

use crate::session_id::SessionId;

/// A single event from an agent, addressed to one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Session this event belongs to.
    pub session_id: SessionId,

    /// Kind-specific payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl SessionEvent {
    pub fn new(session_id: SessionId, payload: EventPayload) -> Self {
        Self {
            session_id,
            payload,
        }
    }
}

/// Event payloads, one variant per agent event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Agent bootstrapped and accepted the prompt.
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },

    /// A chunk of streamed assistant text.
    Text { text: String },

    /// A chunk of the agent's reasoning stream.
    Thinking { text: String },

    /// The agent invoked a tool.
    ToolUse {
        tool_use_id: String,
        tool_name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    /// A tool call finished.
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        is_error: bool,
    },

    /// The agent run finished, successfully or not.
    Result {
        #[serde(default)]
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The agent run failed outside of a normal result.
    Error { message: String },
}

impl EventPayload {
    /// The wire tag for this payload kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Init { .. } => "init",
            EventPayload::Text { .. } => "text",
            EventPayload::Thinking { .. } => "thinking",
            EventPayload::ToolUse { .. } => "tool_use",
            EventPayload::ToolResult { .. } => "tool_result",
            EventPayload::Result { .. } => "result",
            EventPayload::Error { .. } => "error",
        }
    }
}
