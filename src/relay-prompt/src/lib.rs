//! # Relay Prompt Pipeline
//!
//! Staged assembly of the final prompt sent to an agent process. The
//! pipeline combines a raw user message with `@` mention references,
//! bounded conversation history, file attachments, a workspace snapshot,
//! and collaboration context, in a fixed stage order.
//!
//! Project search and workspace snapshots are consumed through the
//! [`ProjectSearcher`] and [`WorkspaceProvider`] traits; the pipeline itself
//! only does best-effort file reads. Plugin prompt transformers run after
//! assembly and are owned by the plugin runtime, not by this crate.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relay_prompt::{PromptInputs, PromptPipeline};
//!
//! let pipeline = PromptPipeline::new(searcher, workspace);
//! let result = pipeline
//!     .assemble(PromptInputs::new("fix the bug in @src/main.rs", "/work/project"))
//!     .await;
//! println!("{}", result.prompt);
//! ```

pub mod attachments;
pub mod error;
pub mod history;
pub mod mention;
pub mod pipeline;
pub mod search;
pub mod workspace;

// Re-exports for convenience
pub use attachments::Attachment;
pub use error::{PromptError, Result};
pub use history::HistoryBudget;
pub use mention::{MentionResolution, ResolvedMention, extract_mentions, normalize_mention};
pub use pipeline::{
    OfficeContext, PromptAssemblyResult, PromptInputs, PromptPipeline, RewardRecord,
};
pub use search::{MAX_SEARCH_RESULTS, ProjectSearcher, SearchHit};
pub use workspace::{WorkspaceProvider, WorkspaceSnapshot};
