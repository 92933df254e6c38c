//! Domain events broadcast to session observers.

use serde::{Deserialize, Serialize};

use crate::state::Subagent;

/// Subagent lifecycle notifications, published on a broadcast channel so UI
/// or logging observers can react without coupling to the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    SubagentSpawned { subagent: Subagent },
    SubagentRemoved { subagent_id: String },
}
