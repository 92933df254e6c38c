//! # Relay Session Router
//!
//! The per-session state machine of the Relay agent runtime. One
//! [`EventRouter`] is bound to each active session; it consumes the typed
//! events an agent process emits, in strict arrival order, and turns them
//! into chat messages, agent/session status, subagent lifecycle, and
//! lifecycle hook emissions through the plugin runtime.
//!
//! Persistence, reward scoring, and completion notification are consumed
//! through the [`MessageSink`], [`RewardFinalizer`], and
//! [`CompletionSignal`] traits; subagent spawn/removal is broadcast as
//! [`DomainEvent`]s for observers.

pub mod collaborators;
pub mod events;
pub mod router;
pub mod state;

// Re-exports for convenience
pub use collaborators::{CompletionSignal, MessageSink, RewardFinalizer, RunOutcome};
pub use events::DomainEvent;
pub use router::EventRouter;
pub use state::{
    AgentStatus, DELEGATION_TOOL, FILE_MUTATING_TOOLS, RunCounters, SUBAGENT_REMOVAL_DELAY,
    SessionStatus, Subagent, SubagentStatus,
};
