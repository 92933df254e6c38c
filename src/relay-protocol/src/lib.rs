//! # Relay Protocol
//!
//! Shared types exchanged between the Relay runtime components: session
//! identifiers, chat messages, and the structured event stream emitted by a
//! running agent process.
//!
//! Everything here is plain data. The state machine that consumes these types
//! lives in `relay-session`; the plugin surface that observes them lives in
//! `relay-plugins`.

pub mod events;
pub mod message;
pub mod session_id;

pub use events::{EventPayload, SessionEvent};
pub use message::{ChatMessage, MessageRole};
pub use session_id::SessionId;
