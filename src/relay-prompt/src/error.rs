//! Error types for prompt assembly.
//!
//! The pipeline is best-effort end to end, so this enum stays small: most
//! failures (unreadable mention targets, missing attachments, workspace
//! snapshot errors) degrade into reference notes or error-callback strings
//! instead of surfacing here. These variants exist for the collaborator
//! traits, whose implementations do real I/O.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("project search failed: {0}")]
    Search(String),

    #[error("workspace snapshot failed: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PromptError>;
