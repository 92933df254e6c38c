//! Session and subagent state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thinking-message preview cap, in characters.
pub const THINKING_PREVIEW_MAX: usize = 200;
/// Tool-result preview cap for hook payloads, in characters.
pub const TOOL_RESULT_PREVIEW_MAX: usize = 200;
/// Subagent name/description cap, in characters.
pub const SUBAGENT_NAME_MAX: usize = 60;
/// How long a finished subagent stays visible before removal.
pub const SUBAGENT_REMOVAL_DELAY: Duration = Duration::from_secs(5);

/// Tools that mutate files; these bump the run's file-write counters.
pub const FILE_MUTATING_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// The tool that delegates work to a subagent.
pub const DELEGATION_TOOL: &str = "Task";

/// What the agent is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentStatus {
    Thinking,
    Streaming,
    ToolCalling { tool: String },
}

/// Lifecycle of the session itself. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Done,
    Error,
}

/// Lifecycle of one delegated subagent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubagentStatus {
    Running,
    Done,
    Error,
}

/// An ephemeral agent entity spawned for a delegation tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subagent {
    /// Internally generated id.
    pub id: String,

    /// Agent that delegated the work, when known.
    pub agent_id: Option<String>,

    /// Monotonically increasing seat index within the session.
    pub seat: u64,

    /// Display name derived from the delegation input.
    pub name: String,

    /// Short description derived from the delegation input.
    pub description: String,

    pub status: SubagentStatus,
}

/// Counters reset at the end of every agent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub tool_calls: u64,
    pub file_writes: u64,
}

/// Truncate to `max` characters on a char boundary.
pub(crate) fn truncate_preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}
