//! The per-session event router and state machine.
//!
//! One router is bound to one active session. Events must be handed to
//! [`EventRouter::handle_event`] strictly in arrival order: several
//! transitions merge into the trailing message, so reordering corrupts the
//! transcript. Lifecycle hooks are emitted through the plugin runtime at
//! each transition; hook failures never block a transition.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use relay_plugins::{HookContext, HookPayload, PluginRuntime};
use relay_protocol::{ChatMessage, EventPayload, MessageRole, SessionEvent, SessionId};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::collaborators::{CompletionSignal, MessageSink, RewardFinalizer, RunOutcome};
use crate::events::DomainEvent;
use crate::state::{
    AgentStatus, DELEGATION_TOOL, FILE_MUTATING_TOOLS, RunCounters, SUBAGENT_NAME_MAX,
    SUBAGENT_REMOVAL_DELAY, SessionStatus, Subagent, SubagentStatus, THINKING_PREVIEW_MAX,
    TOOL_RESULT_PREVIEW_MAX, truncate_preview,
};

/// Mutable session state. Shared with subagent removal timers, which may
/// fire after the owning run has already moved on.
struct SessionState {
    messages: Vec<ChatMessage>,
    agent_status: AgentStatus,
    session_status: SessionStatus,
    /// tool_use_id -> tool name, for tool calls awaiting their result.
    active_tools: HashMap<String, String>,
    /// Subagents by internal id.
    subagents: HashMap<String, Subagent>,
    /// tool_use_id -> subagent id, for delegations awaiting their result.
    subagent_by_tool_use: HashMap<String, String>,
    seat_counter: u64,
    counters: RunCounters,
    /// Files written per agent across the session.
    agent_file_counts: HashMap<String, u64>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            agent_status: AgentStatus::Thinking,
            session_status: SessionStatus::Idle,
            active_tools: HashMap::new(),
            subagents: HashMap::new(),
            subagent_by_tool_use: HashMap::new(),
            seat_counter: 0,
            counters: RunCounters::default(),
            agent_file_counts: HashMap::new(),
        }
    }

    fn drop_thinking_messages(&mut self) {
        self.messages.retain(|m| m.role != MessageRole::Thinking);
    }

    /// Clear run-scoped state at the end of a run. Seat counter and
    /// per-agent file counts outlive runs.
    fn reset_run_state(&mut self) {
        self.counters = RunCounters::default();
        self.active_tools.clear();
    }
}

/// Routes one session's agent events into state updates, hook emissions,
/// and collaborator calls.
pub struct EventRouter {
    session_id: SessionId,
    agent_id: Option<String>,
    workspace_directory: PathBuf,
    plugins: Arc<PluginRuntime>,
    sink: Arc<dyn MessageSink>,
    rewards: Arc<dyn RewardFinalizer>,
    completion: Arc<dyn CompletionSignal>,
    state: Arc<RwLock<SessionState>>,
    domain_tx: broadcast::Sender<DomainEvent>,
}

impl EventRouter {
    pub fn new(
        session_id: SessionId,
        agent_id: Option<String>,
        workspace_directory: impl Into<PathBuf>,
        plugins: Arc<PluginRuntime>,
        sink: Arc<dyn MessageSink>,
        rewards: Arc<dyn RewardFinalizer>,
        completion: Arc<dyn CompletionSignal>,
    ) -> Self {
        let (domain_tx, _) = broadcast::channel(64);
        Self {
            session_id,
            agent_id,
            workspace_directory: workspace_directory.into(),
            plugins,
            sink,
            rewards,
            completion,
            state: Arc::new(RwLock::new(SessionState::new())),
            domain_tx,
        }
    }

    /// Process one event. Events for this session must arrive in order and
    /// must not be processed concurrently.
    pub async fn handle_event(&self, event: SessionEvent) {
        if event.session_id != self.session_id {
            tracing::warn!(
                expected = %self.session_id,
                got = %event.session_id,
                "dropping event for a different session"
            );
            return;
        }
        match event.payload {
            EventPayload::Init { model } => self.on_init(model).await,
            EventPayload::Text { text } => self.on_text(text).await,
            EventPayload::Thinking { text } => self.on_thinking(text).await,
            EventPayload::ToolUse {
                tool_use_id,
                tool_name,
                input,
            } => self.on_tool_use(tool_use_id, tool_name, input).await,
            EventPayload::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => self.on_tool_result(tool_use_id, content, is_error).await,
            EventPayload::Result { is_error, message } => self.on_result(is_error, message).await,
            EventPayload::Error { message } => self.on_error(message).await,
        }
    }

    fn hook_context(&self) -> HookContext {
        HookContext::new(
            self.session_id.to_string(),
            self.workspace_directory.clone(),
            self.agent_id.clone(),
        )
    }

    async fn emit(&self, payload: HookPayload) {
        self.plugins.emit_hook(&self.hook_context(), &payload).await;
    }

    async fn on_init(&self, model: Option<String>) {
        if let Some(model) = model {
            tracing::debug!(session_id = %self.session_id, %model, "agent initialized");
        }
        let mut state = self.state.write().await;
        state.agent_status = AgentStatus::Thinking;
        if state.session_status == SessionStatus::Idle {
            state.session_status = SessionStatus::Running;
        }
    }

    async fn on_text(&self, text: String) {
        let mut state = self.state.write().await;
        match state.messages.last_mut() {
            // Streaming merge into the trailing plain assistant message.
            Some(last) if last.is_plain_assistant() => last.content.push_str(&text),
            _ => state.messages.push(ChatMessage::assistant(text)),
        }
        state.agent_status = AgentStatus::Streaming;
    }

    async fn on_thinking(&self, text: String) {
        let mut state = self.state.write().await;
        state.drop_thinking_messages();
        state
            .messages
            .push(ChatMessage::thinking(truncate_preview(&text, THINKING_PREVIEW_MAX)));
        state.agent_status = AgentStatus::Thinking;
    }

    async fn on_tool_use(&self, tool_use_id: String, tool_name: String, input: serde_json::Value) {
        {
            let mut state = self.state.write().await;
            state.counters.tool_calls += 1;
            state
                .active_tools
                .insert(tool_use_id.clone(), tool_name.clone());
        }

        self.emit(HookPayload::BeforeToolCall {
            tool_name: tool_name.clone(),
            tool_use_id: tool_use_id.clone(),
        })
        .await;

        let mut state = self.state.write().await;
        state.drop_thinking_messages();
        state
            .messages
            .push(ChatMessage::tool_call(&tool_name, input.clone(), &tool_use_id));
        state.agent_status = AgentStatus::ToolCalling {
            tool: tool_name.clone(),
        };

        if FILE_MUTATING_TOOLS.contains(&tool_name.as_str()) {
            state.counters.file_writes += 1;
            if let Some(agent_id) = &self.agent_id {
                *state.agent_file_counts.entry(agent_id.clone()).or_default() += 1;
            }
        }

        if tool_name == DELEGATION_TOOL {
            self.spawn_subagent(&mut state, &tool_use_id, &input);
        }
    }

    fn spawn_subagent(
        &self,
        state: &mut SessionState,
        tool_use_id: &str,
        input: &serde_json::Value,
    ) {
        let seat = state.seat_counter;
        state.seat_counter += 1;

        let name = input
            .get("description")
            .and_then(|v| v.as_str())
            .map(|s| truncate_preview(s, SUBAGENT_NAME_MAX))
            .unwrap_or_else(|| format!("Subagent {seat}"));
        let description = input
            .get("prompt")
            .and_then(|v| v.as_str())
            .map(|s| truncate_preview(s, SUBAGENT_NAME_MAX))
            .unwrap_or_default();

        let subagent = Subagent {
            id: Uuid::new_v4().to_string(),
            agent_id: self.agent_id.clone(),
            seat,
            name,
            description,
            status: SubagentStatus::Running,
        };
        state
            .subagent_by_tool_use
            .insert(tool_use_id.to_string(), subagent.id.clone());
        state.subagents.insert(subagent.id.clone(), subagent.clone());
        tracing::debug!(session_id = %self.session_id, seat, subagent_id = %subagent.id, "spawned subagent");
        let _ = self.domain_tx.send(DomainEvent::SubagentSpawned { subagent });
    }

    async fn on_tool_result(&self, tool_use_id: String, content: String, is_error: bool) {
        let tool_name = {
            let mut state = self.state.write().await;
            state.active_tools.remove(&tool_use_id)
        };

        self.emit(HookPayload::AfterToolCall {
            tool_name,
            tool_use_id: tool_use_id.clone(),
            is_error,
        })
        .await;
        self.emit(HookPayload::ToolResultPersist {
            tool_use_id: tool_use_id.clone(),
            preview: truncate_preview(&content, TOOL_RESULT_PREVIEW_MAX),
        })
        .await;

        let mut state = self.state.write().await;
        state
            .messages
            .push(ChatMessage::tool_result(content, &tool_use_id, is_error));

        if let Some(subagent_id) = state.subagent_by_tool_use.remove(&tool_use_id) {
            if let Some(subagent) = state.subagents.get_mut(&subagent_id) {
                subagent.status = if is_error {
                    SubagentStatus::Error
                } else {
                    SubagentStatus::Done
                };
            }
            self.schedule_subagent_removal(subagent_id);
        } else {
            state.agent_status = AgentStatus::Streaming;
        }
    }

    /// Remove the subagent after a fixed delay. The timer runs independently
    /// of the event stream and may fire after the session ended.
    fn schedule_subagent_removal(&self, subagent_id: String) {
        let state = self.state.clone();
        let domain_tx = self.domain_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SUBAGENT_REMOVAL_DELAY).await;
            if state.write().await.subagents.remove(&subagent_id).is_some() {
                let _ = domain_tx.send(DomainEvent::SubagentRemoved { subagent_id });
            }
        });
    }

    /// Remove every remaining subagent immediately (end of run).
    async fn clear_subagents(&self) {
        let removed: Vec<String> = {
            let mut state = self.state.write().await;
            state.subagent_by_tool_use.clear();
            state.subagents.drain().map(|(id, _)| id).collect()
        };
        for subagent_id in removed {
            let _ = self.domain_tx.send(DomainEvent::SubagentRemoved { subagent_id });
        }
    }

    async fn on_result(&self, is_error: bool, message: Option<String>) {
        let (final_message, finished_counters) = {
            let mut state = self.state.write().await;
            state.drop_thinking_messages();
            let final_message = state
                .messages
                .iter()
                .rev()
                .find(|m| m.is_plain_assistant() && !m.content.trim().is_empty())
                .cloned();
            (final_message, state.counters)
        };

        if let Some(message) = final_message {
            let preview = truncate_preview(&message.content, TOOL_RESULT_PREVIEW_MAX);
            // Deferred so persistence never blocks this transition.
            let sink = self.sink.clone();
            let session_id = self.session_id;
            tokio::spawn(async move {
                if let Err(e) = sink.persist(session_id, &message).await {
                    tracing::warn!(session_id = %session_id, error = %e, "failed to persist assistant message");
                }
            });
            self.emit(HookPayload::MessageSent {
                role: MessageRole::Assistant.label().to_lowercase(),
                preview,
            })
            .await;
        }

        let outcome = if is_error {
            self.emit(HookPayload::MessageSent {
                role: MessageRole::Error.label().to_lowercase(),
                preview: message.clone().unwrap_or_default(),
            })
            .await;
            let mut state = self.state.write().await;
            state
                .messages
                .push(ChatMessage::error(message.unwrap_or_else(|| "Agent run failed".into())));
            state.session_status = SessionStatus::Error;
            RunOutcome::Error
        } else {
            let already_done = {
                let mut state = self.state.write().await;
                let was = state.session_status == SessionStatus::Done;
                state.session_status = SessionStatus::Done;
                was
            };
            if !already_done {
                self.completion.notify(self.session_id).await;
            }
            RunOutcome::Success
        };

        self.clear_subagents().await;
        self.rewards
            .finalize(self.session_id, outcome, finished_counters)
            .await;
        self.state.write().await.reset_run_state();
    }

    async fn on_error(&self, message: String) {
        self.emit(HookPayload::MessageSent {
            role: MessageRole::Error.label().to_lowercase(),
            preview: truncate_preview(&message, TOOL_RESULT_PREVIEW_MAX),
        })
        .await;

        let finished_counters = {
            let mut state = self.state.write().await;
            state.drop_thinking_messages();
            state.messages.push(ChatMessage::error(message));
            state.session_status = SessionStatus::Error;
            state.counters
        };

        self.clear_subagents().await;
        self.rewards
            .finalize(self.session_id, RunOutcome::Error, finished_counters)
            .await;
        self.state.write().await.reset_run_state();
    }

    // ========== Observation ==========

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn session_status(&self) -> SessionStatus {
        self.state.read().await.session_status
    }

    pub async fn agent_status(&self) -> AgentStatus {
        self.state.read().await.agent_status.clone()
    }

    /// Current subagents, ordered by seat.
    pub async fn subagents(&self) -> Vec<Subagent> {
        let mut subagents: Vec<Subagent> =
            self.state.read().await.subagents.values().cloned().collect();
        subagents.sort_by_key(|s| s.seat);
        subagents
    }

    pub async fn counters(&self) -> RunCounters {
        self.state.read().await.counters
    }

    /// Files written by `agent_id` across the session.
    pub async fn agent_file_count(&self, agent_id: &str) -> u64 {
        self.state
            .read()
            .await
            .agent_file_counts
            .get(agent_id)
            .copied()
            .unwrap_or(0)
    }

    /// Subscribe to subagent lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.domain_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use relay_plugins::{
        HookEvent, HookHandler, ModuleCleanup, NativeModuleHost, PluginApi, PluginModule,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSink(Mutex<Vec<ChatMessage>>);

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn persist(&self, _session_id: SessionId, message: &ChatMessage) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct RecordingRewards(Mutex<Vec<(RunOutcome, RunCounters)>>);

    #[async_trait]
    impl RewardFinalizer for RecordingRewards {
        async fn finalize(&self, _session_id: SessionId, outcome: RunOutcome, counters: RunCounters) {
            self.0.lock().unwrap().push((outcome, counters));
        }
    }

    struct CountingCompletion(AtomicUsize);

    #[async_trait]
    impl CompletionSignal for CountingCompletion {
        async fn notify(&self, _session_id: SessionId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        router: EventRouter,
        sink: Arc<RecordingSink>,
        rewards: Arc<RecordingRewards>,
        completion: Arc<CountingCompletion>,
    }

    async fn fixture_with(plugins: Arc<PluginRuntime>) -> Fixture {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let rewards = Arc::new(RecordingRewards(Mutex::new(Vec::new())));
        let completion = Arc::new(CountingCompletion(AtomicUsize::new(0)));
        let router = EventRouter::new(
            SessionId::new(),
            Some("agent-1".to_string()),
            "/work",
            plugins,
            sink.clone(),
            rewards.clone(),
            completion.clone(),
        );
        Fixture {
            router,
            sink,
            rewards,
            completion,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(PluginRuntime::new(Arc::new(NativeModuleHost::new())).await).await
    }

    impl Fixture {
        async fn dispatch(&self, payload: EventPayload) {
            self.router
                .handle_event(SessionEvent::new(self.router.session_id(), payload))
                .await;
        }

        async fn delegate(&self, tool_use_id: &str) {
            self.dispatch(EventPayload::ToolUse {
                tool_use_id: tool_use_id.to_string(),
                tool_name: DELEGATION_TOOL.to_string(),
                input: serde_json::json!({"description": "Explore the repo", "prompt": "look around"}),
            })
            .await;
        }
    }

    #[tokio::test]
    async fn test_text_merges_into_trailing_assistant_message() {
        let f = fixture().await;
        f.dispatch(EventPayload::Init { model: None }).await;
        f.dispatch(EventPayload::Text { text: "Hel".into() }).await;
        f.dispatch(EventPayload::Text { text: "lo".into() }).await;

        let messages = f.router.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(f.router.agent_status().await, AgentStatus::Streaming);
        assert_eq!(f.router.session_status().await, SessionStatus::Running);
    }

    #[tokio::test]
    async fn test_text_after_tool_call_starts_new_message() {
        let f = fixture().await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t1".into(),
            tool_name: "Read".into(),
            input: serde_json::json!({}),
        })
        .await;
        f.dispatch(EventPayload::Text { text: "done".into() }).await;

        let messages = f.router.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "done");
    }

    #[tokio::test]
    async fn test_thinking_replaces_and_truncates() {
        let f = fixture().await;
        f.dispatch(EventPayload::Thinking { text: "first".into() }).await;
        f.dispatch(EventPayload::Thinking { text: "x".repeat(500) }).await;

        let messages = f.router.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Thinking);
        assert_eq!(messages[0].content.len(), THINKING_PREVIEW_MAX);
        assert_eq!(f.router.agent_status().await, AgentStatus::Thinking);
    }

    #[tokio::test]
    async fn test_file_mutating_tool_bumps_counters() {
        let f = fixture().await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t1".into(),
            tool_name: "Write".into(),
            input: serde_json::json!({"file_path": "a.rs"}),
        })
        .await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t2".into(),
            tool_name: "Read".into(),
            input: serde_json::json!({}),
        })
        .await;

        let counters = f.router.counters().await;
        assert_eq!(counters.tool_calls, 2);
        assert_eq!(counters.file_writes, 1);
        assert_eq!(f.router.agent_file_count("agent-1").await, 1);
        assert_eq!(
            f.router.agent_status().await,
            AgentStatus::ToolCalling { tool: "Read".into() }
        );
    }

    #[tokio::test]
    async fn test_delegation_assigns_sequential_seats() {
        let f = fixture().await;
        let mut rx = f.router.subscribe();
        f.delegate("t1").await;
        f.delegate("t2").await;

        let subagents = f.router.subagents().await;
        assert_eq!(subagents.len(), 2);
        assert_eq!(subagents[0].seat, 0);
        assert_eq!(subagents[1].seat, 1);
        assert_eq!(subagents[0].name, "Explore the repo");
        assert_eq!(subagents[0].status, SubagentStatus::Running);

        assert!(matches!(rx.recv().await, Ok(DomainEvent::SubagentSpawned { .. })));
        assert!(matches!(rx.recv().await, Ok(DomainEvent::SubagentSpawned { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subagent_done_then_removed_after_delay() {
        let f = fixture().await;
        f.delegate("t1").await;
        f.dispatch(EventPayload::ToolResult {
            tool_use_id: "t1".into(),
            content: "delegated work finished".into(),
            is_error: false,
        })
        .await;

        let subagents = f.router.subagents().await;
        assert_eq!(subagents.len(), 1);
        assert_eq!(subagents[0].status, SubagentStatus::Done);
        // A subagent result does not flip the parent back to streaming.
        assert_ne!(f.router.agent_status().await, AgentStatus::Streaming);

        let mut rx = f.router.subscribe();
        tokio::time::sleep(SUBAGENT_REMOVAL_DELAY + std::time::Duration::from_secs(1)).await;
        assert!(f.router.subagents().await.is_empty());
        assert!(matches!(rx.recv().await, Ok(DomainEvent::SubagentRemoved { .. })));
    }

    #[tokio::test]
    async fn test_plain_tool_result_returns_to_streaming() {
        let f = fixture().await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t1".into(),
            tool_name: "Read".into(),
            input: serde_json::json!({}),
        })
        .await;
        f.dispatch(EventPayload::ToolResult {
            tool_use_id: "t1".into(),
            content: "file contents".into(),
            is_error: false,
        })
        .await;

        assert_eq!(f.router.agent_status().await, AgentStatus::Streaming);
        let messages = f.router.messages().await;
        assert_eq!(messages.last().unwrap().role, MessageRole::Tool);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_result_completes_session() {
        let f = fixture().await;
        f.delegate("t1").await;
        f.dispatch(EventPayload::Text { text: "all done".into() }).await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t2".into(),
            tool_name: "Write".into(),
            input: serde_json::json!({}),
        })
        .await;
        f.dispatch(EventPayload::Result {
            is_error: false,
            message: None,
        })
        .await;

        assert_eq!(f.router.session_status().await, SessionStatus::Done);
        assert_eq!(f.completion.0.load(Ordering::SeqCst), 1);
        assert!(f.router.subagents().await.is_empty());

        let finalized = f.rewards.0.lock().unwrap().clone();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].0, RunOutcome::Success);
        assert_eq!(finalized[0].1.tool_calls, 2);
        assert_eq!(finalized[0].1.file_writes, 1);
        // Run-scoped counters reset after finalization.
        assert_eq!(f.router.counters().await, RunCounters::default());

        // Deferred persistence of the final assistant message.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let persisted = f.sink.0.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].content, "all done");
    }

    #[tokio::test]
    async fn test_error_result_sets_error_status() {
        let f = fixture().await;
        f.dispatch(EventPayload::Thinking { text: "hmm".into() }).await;
        f.dispatch(EventPayload::Result {
            is_error: true,
            message: Some("budget exceeded".into()),
        })
        .await;

        assert_eq!(f.router.session_status().await, SessionStatus::Error);
        assert_eq!(f.completion.0.load(Ordering::SeqCst), 0);
        let messages = f.router.messages().await;
        // Thinking stripped, error appended.
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Error);
        assert_eq!(messages[0].content, "budget exceeded");
        assert_eq!(f.rewards.0.lock().unwrap()[0].0, RunOutcome::Error);
    }

    #[tokio::test]
    async fn test_error_event() {
        let f = fixture().await;
        f.delegate("t1").await;
        f.dispatch(EventPayload::Error {
            message: "agent crashed".into(),
        })
        .await;

        assert_eq!(f.router.session_status().await, SessionStatus::Error);
        assert!(f.router.subagents().await.is_empty());
        let messages = f.router.messages().await;
        assert_eq!(messages.last().unwrap().content, "agent crashed");
        assert_eq!(f.rewards.0.lock().unwrap()[0].0, RunOutcome::Error);
    }

    #[tokio::test]
    async fn test_event_for_other_session_dropped() {
        let f = fixture().await;
        f.router
            .handle_event(SessionEvent::new(
                SessionId::new(),
                EventPayload::Text { text: "stray".into() },
            ))
            .await;
        assert!(f.router.messages().await.is_empty());
    }

    struct RecordingHook(Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl HookHandler for RecordingHook {
        async fn handle(&self, _ctx: &HookContext, payload: &HookPayload) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(match payload {
                HookPayload::BeforeToolCall { .. } => "before_tool_call",
                HookPayload::AfterToolCall { .. } => "after_tool_call",
                HookPayload::ToolResultPersist { .. } => "tool_result_persist",
                HookPayload::MessageSent { .. } => "message_sent",
                _ => "other",
            });
            Ok(())
        }
    }

    struct HookModule(Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl PluginModule for HookModule {
        async fn register(&self, api: &mut PluginApi) -> anyhow::Result<Option<ModuleCleanup>> {
            for event in [
                HookEvent::BeforeToolCall,
                HookEvent::AfterToolCall,
                HookEvent::ToolResultPersist,
                HookEvent::MessageSent,
            ] {
                api.register_hook(event, Arc::new(RecordingHook(self.0.clone())), 0).await;
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_transitions_emit_hooks_through_loaded_plugin() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("recorder");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("relay-plugin.json"),
            r#"{"id":"recorder","name":"Recorder","version":"1.0.0","rendererEntry":"index.js"}"#,
        )
        .unwrap();
        std::fs::write(root.join("index.js"), "// entry").unwrap();

        let recorded: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let host = Arc::new(NativeModuleHost::new());
        let captured = recorded.clone();
        host.register_factory("index.js", {
            Arc::new(move || Arc::new(HookModule(captured.clone())) as Arc<dyn PluginModule>)
        })
        .await;
        let plugins = PluginRuntime::new(host).await;
        plugins.sync_catalog(&[tmp.path().to_path_buf()]).await;

        let f = fixture_with(plugins).await;
        f.dispatch(EventPayload::ToolUse {
            tool_use_id: "t1".into(),
            tool_name: "Read".into(),
            input: serde_json::json!({}),
        })
        .await;
        f.dispatch(EventPayload::ToolResult {
            tool_use_id: "t1".into(),
            content: "ok".into(),
            is_error: false,
        })
        .await;

        assert_eq!(
            *recorded.lock().unwrap(),
            vec!["before_tool_call", "after_tool_call", "tool_result_persist"]
        );
    }
}
