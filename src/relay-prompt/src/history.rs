//! Conversation history injection.
//!
//! Recent turns are serialized as `[Role] content` lines and wrapped between
//! a context header and a `[Current user request]` marker, filling backward
//! from the most recent message under a message-count and a character
//! budget. Thinking-role messages never appear in history.

use relay_protocol::{ChatMessage, MessageRole};

/// Header introducing the injected block.
const HISTORY_HEADER: &str = "[Recent conversation context]";
/// Marker separating history from the live request.
const REQUEST_MARKER: &str = "[Current user request]";
/// Notice prepended inside the block when older turns were cut.
const OMISSION_NOTICE: &str = "(earlier turns omitted)";

/// Recent-window cap applied before the per-message budgets.
const RECENT_WINDOW: usize = 40;

/// Budgets for the injected block.
#[derive(Debug, Clone, Copy)]
pub struct HistoryBudget {
    /// Maximum serialized messages.
    pub max_messages: usize,

    /// Maximum total characters across serialized lines.
    pub max_chars: usize,
}

impl Default for HistoryBudget {
    fn default() -> Self {
        Self {
            max_messages: 12,
            max_chars: 6_000,
        }
    }
}

fn serialize_line(message: &ChatMessage) -> String {
    format!("[{}] {}", message.role.label(), message.content.trim())
}

/// Wrap `prompt` with a bounded window of prior messages. With no usable
/// history the prompt passes through unchanged.
pub fn inject_history(
    prompt: &str,
    history: &[ChatMessage],
    budget: HistoryBudget,
) -> String {
    let usable: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| m.role != MessageRole::Thinking && !m.content.trim().is_empty())
        .collect();
    if usable.is_empty() || budget.max_messages == 0 {
        return prompt.to_string();
    }

    let window_start = usable.len().saturating_sub(RECENT_WINDOW);
    let window = &usable[window_start..];

    // Fill backward from the most recent message.
    let mut lines: Vec<String> = Vec::new();
    let mut chars = 0usize;
    let mut truncated = window_start > 0;
    for message in window.iter().rev() {
        if lines.len() >= budget.max_messages {
            truncated = true;
            break;
        }
        let line = serialize_line(message);
        if chars + line.len() > budget.max_chars {
            truncated = true;
            break;
        }
        chars += line.len();
        lines.push(line);
    }
    if lines.is_empty() {
        return prompt.to_string();
    }
    lines.reverse();

    let mut block = String::new();
    block.push_str(HISTORY_HEADER);
    block.push('\n');
    if truncated {
        block.push_str(OMISSION_NOTICE);
        block.push('\n');
    }
    for line in &lines {
        block.push_str(line);
        block.push('\n');
    }
    block.push('\n');
    block.push_str(REQUEST_MARKER);
    block.push('\n');
    block.push_str(prompt);
    block
}
