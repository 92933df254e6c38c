//! External collaborators the router drives but does not implement.
//!
//! Persistence, reward scoring, and completion notification all live
//! outside this crate; the router only needs these seams. Implementations
//! must tolerate being called after the session reached a terminal state
//! (deferred persistence and subagent timers outlive transitions).

use async_trait::async_trait;
use relay_protocol::{ChatMessage, SessionId};

use crate::state::RunCounters;

/// How an agent run ended, for reward finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Error,
}

/// Message persistence.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn persist(&self, session_id: SessionId, message: &ChatMessage) -> anyhow::Result<()>;
}

/// Finalizes the run's reward computation when a session ends.
#[async_trait]
pub trait RewardFinalizer: Send + Sync {
    async fn finalize(&self, session_id: SessionId, outcome: RunOutcome, counters: RunCounters);
}

/// Fired exactly once when a session finishes successfully.
#[async_trait]
pub trait CompletionSignal: Send + Sync {
    async fn notify(&self, session_id: SessionId);
}
