//! Lifecycle hook registry and dispatch.
//!
//! Hooks are registered per event kind with an integer order; dispatch runs
//! strictly in ascending order (ties broken by registration sequence) and
//! awaits each handler before the next. A failing handler is logged with its
//! owning plugin id and skipped; callers never observe handler errors.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The lifecycle points plugins can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    BeforeAgentStart,
    AgentEnd,
    SessionStart,
    SessionEnd,
    MessageReceived,
    MessageSending,
    MessageSent,
    BeforeToolCall,
    AfterToolCall,
    ToolResultPersist,
}

impl HookEvent {
    /// All hook events, in catalog order.
    pub const ALL: [HookEvent; 10] = [
        HookEvent::BeforeAgentStart,
        HookEvent::AgentEnd,
        HookEvent::SessionStart,
        HookEvent::SessionEnd,
        HookEvent::MessageReceived,
        HookEvent::MessageSending,
        HookEvent::MessageSent,
        HookEvent::BeforeToolCall,
        HookEvent::AfterToolCall,
        HookEvent::ToolResultPersist,
    ];
}

/// Fields common to every hook emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    /// Owning chat session.
    pub chat_session_id: String,

    /// Workspace the session runs in.
    pub workspace_directory: PathBuf,

    /// Agent the session belongs to, when known.
    pub agent_id: Option<String>,

    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
}

impl HookContext {
    pub fn new(
        chat_session_id: impl Into<String>,
        workspace_directory: impl Into<PathBuf>,
        agent_id: Option<String>,
    ) -> Self {
        Self {
            chat_session_id: chat_session_id.into(),
            workspace_directory: workspace_directory.into(),
            agent_id,
            timestamp: Utc::now(),
        }
    }
}

/// Kind-specific hook payloads, one variant per [`HookEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookPayload {
    BeforeAgentStart {
        prompt_preview: String,
    },
    AgentEnd {
        outcome: String,
    },
    SessionStart,
    SessionEnd,
    MessageReceived {
        message: String,
        length: usize,
    },
    MessageSending {
        message: String,
        length: usize,
    },
    MessageSent {
        role: String,
        preview: String,
    },
    BeforeToolCall {
        tool_name: String,
        tool_use_id: String,
    },
    AfterToolCall {
        tool_name: Option<String>,
        tool_use_id: String,
        is_error: bool,
    },
    ToolResultPersist {
        tool_use_id: String,
        preview: String,
    },
}

impl HookPayload {
    /// The event kind this payload belongs to.
    pub fn event(&self) -> HookEvent {
        match self {
            HookPayload::BeforeAgentStart { .. } => HookEvent::BeforeAgentStart,
            HookPayload::AgentEnd { .. } => HookEvent::AgentEnd,
            HookPayload::SessionStart => HookEvent::SessionStart,
            HookPayload::SessionEnd => HookEvent::SessionEnd,
            HookPayload::MessageReceived { .. } => HookEvent::MessageReceived,
            HookPayload::MessageSending { .. } => HookEvent::MessageSending,
            HookPayload::MessageSent { .. } => HookEvent::MessageSent,
            HookPayload::BeforeToolCall { .. } => HookEvent::BeforeToolCall,
            HookPayload::AfterToolCall { .. } => HookEvent::AfterToolCall,
            HookPayload::ToolResultPersist { .. } => HookEvent::ToolResultPersist,
        }
    }
}

/// Handler invoked at a lifecycle point.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, ctx: &HookContext, payload: &HookPayload) -> anyhow::Result<()>;
}

/// Registered hook with dispatch metadata.
#[derive(Clone)]
pub(crate) struct RegisteredHook {
    pub id: u64,
    pub plugin_id: String,
    pub order: i32,
    /// Registration sequence, breaks order ties.
    pub seq: u64,
    pub handler: Arc<dyn HookHandler>,
}

/// Registry of hook handlers, one ordered list per event kind.
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookEvent, Vec<RegisteredHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler. `id` and `seq` come from the runtime's counters and
    /// are never reused.
    pub(crate) async fn register(
        &self,
        event: HookEvent,
        plugin_id: &str,
        handler: Arc<dyn HookHandler>,
        order: i32,
        id: u64,
        seq: u64,
    ) {
        let mut hooks = self.hooks.write().await;
        let list = hooks.entry(event).or_default();
        list.push(RegisteredHook {
            id,
            plugin_id: plugin_id.to_string(),
            order,
            seq,
            handler,
        });
        list.sort_by_key(|h| (h.order, h.seq));
        tracing::debug!(?event, plugin_id, order, "registered hook");
    }

    /// Remove one registration.
    pub(crate) async fn unregister(&self, event: HookEvent, id: u64) {
        let mut hooks = self.hooks.write().await;
        if let Some(list) = hooks.get_mut(&event) {
            list.retain(|h| h.id != id);
        }
    }

    /// Dispatch a payload to every handler for its event, sequentially, in
    /// ascending order. Handler failures are isolated.
    pub async fn emit(&self, ctx: &HookContext, payload: &HookPayload) {
        let event = payload.event();
        let handlers: Vec<RegisteredHook> = {
            let hooks = self.hooks.read().await;
            match hooks.get(&event) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return,
            }
        };

        for hook in handlers {
            if let Err(e) = hook.handler.handle(ctx, payload).await {
                tracing::warn!(
                    ?event,
                    plugin_id = %hook.plugin_id,
                    error = %e,
                    "hook handler failed"
                );
            }
        }
    }

    /// Number of handlers registered for an event.
    pub async fn handler_count(&self, event: HookEvent) -> usize {
        self.hooks
            .read()
            .await
            .get(&event)
            .map_or(0, |list| list.len())
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
