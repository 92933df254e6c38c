//! The staged prompt-assembly pipeline.
//!
//! Stage order is fixed: mention tokens, workspace snapshot, history,
//! mention reference blocks, attachments, accumulated notes, workspace
//! block, collaboration block. The plugin prompt-transformer chain is not
//! owned here; the surrounding orchestrator runs it over the assembled
//! prompt.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use relay_protocol::ChatMessage;

use crate::attachments::{Attachment, is_binary_name, render_attachment_block};
use crate::history::{HistoryBudget, inject_history};
use crate::mention::{ResolvedMention, extract_mentions, normalize_mention, resolve_mentions};
use crate::search::ProjectSearcher;
use crate::workspace::{WorkspaceProvider, WorkspaceSnapshot};

/// Per-file cap on injected reference content, in characters.
pub const MAX_REFERENCE_CHARS: usize = 20_000;
/// Reward notes shown in the collaboration block.
pub const MAX_REWARD_NOTES: usize = 3;
/// Feedback strings shown in the collaboration block.
pub const MAX_FEEDBACK_ITEMS: usize = 6;

/// Latest reward record for the collaboration block.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardRecord {
    pub score: f64,
    pub status: String,
    pub notes: Vec<String>,
}

/// Collaboration/office context supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfficeContext {
    pub latest_reward: Option<RewardRecord>,
    pub recent_feedback: Vec<String>,
}

/// Everything the pipeline consumes for one assembly.
#[derive(Default)]
pub struct PromptInputs {
    /// The user's message as typed.
    pub raw_message: String,

    /// Working directory for workspace context and relative resolution.
    pub working_directory: PathBuf,

    /// When set, bypasses mention extraction (entries are still normalized).
    pub explicit_mentions: Option<Vec<String>>,

    /// Attached files.
    pub attachments: Vec<Attachment>,

    /// Prior conversation messages, oldest first.
    pub history: Vec<ChatMessage>,

    /// Budgets for the history block.
    pub history_budget: HistoryBudget,

    /// Collaboration context, when available.
    pub office: Option<OfficeContext>,
}

impl PromptInputs {
    pub fn new(raw_message: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            raw_message: raw_message.into(),
            working_directory: working_directory.into(),
            history_budget: HistoryBudget::default(),
            ..Default::default()
        }
    }
}

/// What the pipeline produced, for the caller to persist and display.
#[derive(Debug, Clone)]
pub struct PromptAssemblyResult {
    /// The assembled prompt.
    pub prompt: String,

    /// Mentions that resolved to files, in mention order.
    pub mentions: Vec<ResolvedMention>,

    pub resolved_count: usize,
    pub unresolved_count: usize,

    /// Snapshot used for the workspace block, when one was obtained.
    pub workspace: Option<WorkspaceSnapshot>,
}

/// Callback receiving best-effort failure descriptions.
pub type ErrorHook = Arc<dyn Fn(String) + Send + Sync>;

/// The prompt-assembly pipeline over its two collaborators.
pub struct PromptPipeline {
    searcher: Arc<dyn ProjectSearcher>,
    workspace: Arc<dyn WorkspaceProvider>,
    error_hook: Option<ErrorHook>,
}

impl PromptPipeline {
    pub fn new(searcher: Arc<dyn ProjectSearcher>, workspace: Arc<dyn WorkspaceProvider>) -> Self {
        Self {
            searcher,
            workspace,
            error_hook: None,
        }
    }

    /// Route best-effort failures (workspace snapshot errors) to a callback
    /// instead of dropping them silently.
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    fn report(&self, message: String) {
        tracing::debug!("{message}");
        if let Some(hook) = &self.error_hook {
            hook(message);
        }
    }

    /// Run every stage and return the assembled prompt. Never fails: every
    /// stage degrades to notes or skipped blocks.
    pub async fn assemble(&self, inputs: PromptInputs) -> PromptAssemblyResult {
        // Stage 1: mention tokens.
        let tokens = match &inputs.explicit_mentions {
            Some(list) => {
                let mut seen = HashSet::new();
                list.iter()
                    .filter_map(|raw| normalize_mention(raw))
                    .filter(|token| seen.insert(token.clone()))
                    .collect()
            }
            None => extract_mentions(&inputs.raw_message),
        };

        // Stage 2: workspace snapshot, best-effort.
        let snapshot = match self.workspace.snapshot(&inputs.working_directory).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.report(format!("workspace snapshot failed: {e}"));
                None
            }
        };

        // Stage 3: history.
        let mut prompt = inject_history(&inputs.raw_message, &inputs.history, inputs.history_budget);
        let mut notes: Vec<String> = Vec::new();

        // Stage 4: mention references.
        let resolution = resolve_mentions(self.searcher.as_ref(), &tokens).await;
        for resolved in &resolution.resolved {
            match tokio::fs::read_to_string(&resolved.path).await {
                Ok(content) => {
                    let mut content = content.replace('\0', "");
                    if truncate_chars(&mut content, MAX_REFERENCE_CHARS) {
                        notes.push(format!("@{} truncated", resolved.mention));
                    }
                    prompt.push_str(&format!(
                        "\n\n--- Referenced file: {rel} ---\n{content}\n--- End of {rel} ---",
                        rel = resolved.rel_path
                    ));
                }
                Err(e) => notes.push(format!("could not read @{}: {e}", resolved.mention)),
            }
        }
        if !resolution.unresolved.is_empty() {
            notes.push(format!(
                "Unresolved @ references: {}",
                resolution.unresolved.join(", ")
            ));
        }

        // Stage 5: attachments.
        let mut binary_names = Vec::new();
        for attachment in &inputs.attachments {
            if is_binary_name(&attachment.name) {
                binary_names.push(attachment.name.clone());
                continue;
            }
            // Single-file read failures are swallowed.
            if let Ok(content) = tokio::fs::read_to_string(&attachment.path).await {
                prompt.push_str("\n\n");
                prompt.push_str(&render_attachment_block(&attachment.name, &content));
            }
        }
        if !binary_names.is_empty() {
            notes.push(format!(
                "Binary attachments (content not included): {}",
                binary_names.join(", ")
            ));
        }

        // Stage 6: accumulated notes as one bracketed line.
        if !notes.is_empty() {
            prompt.push_str(&format!("\n\n[{}]", notes.join("; ")));
        }

        // Stage 7: workspace block.
        if let Some(snapshot) = &snapshot {
            prompt.push_str("\n\n");
            prompt.push_str(&snapshot.render());
        }

        // Stage 8: collaboration block, always appended.
        prompt.push_str("\n\n");
        prompt.push_str(&render_office_block(inputs.office.as_ref()));

        PromptAssemblyResult {
            prompt,
            resolved_count: resolution.resolved.len(),
            unresolved_count: resolution.unresolved.len(),
            mentions: resolution.resolved,
            workspace: snapshot,
        }
    }
}

/// Render the collaboration/office block. The framing is fixed; reward and
/// feedback sections appear only when supplied.
fn render_office_block(office: Option<&OfficeContext>) -> String {
    let mut lines = vec![
        "[Collaboration context]".to_string(),
        "You are working in a live shared session; collaborators observe progress as it happens."
            .to_string(),
    ];
    if let Some(office) = office {
        if let Some(reward) = &office.latest_reward {
            lines.push(format!(
                "Latest review: score {:.1} ({})",
                reward.score, reward.status
            ));
            for note in reward.notes.iter().take(MAX_REWARD_NOTES) {
                lines.push(format!("- {note}"));
            }
        }
        if !office.recent_feedback.is_empty() {
            lines.push("Recent feedback:".to_string());
            for feedback in office.recent_feedback.iter().take(MAX_FEEDBACK_ITEMS) {
                lines.push(format!("- {feedback}"));
            }
        }
    }
    lines.join("\n")
}

/// Truncate at a char boundary; returns whether anything was cut.
fn truncate_chars(content: &mut String, max_bytes: usize) -> bool {
    if content.len() <= max_bytes {
        return false;
    }
    let mut cut = max_bytes;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
    true
}
