//! Project search collaborator.
//!
//! Mention resolution needs a project-wide file search but does not care how
//! it is implemented (index, ripgrep, OS API). The pipeline consumes it
//! through this trait; implementations must be case-insensitive, dedupe
//! their hits, and respect the requested cap.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

/// Cap passed to [`ProjectSearcher::search`] during mention resolution.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// One candidate file from a project search, ordered most-relevant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Absolute path.
    pub path: PathBuf,

    /// Path relative to the search root, forward slashes.
    pub rel_path: String,

    /// Directories are never eligible mention targets but may still appear
    /// in search output.
    pub is_dir: bool,
}

/// Case-insensitive project-wide file search.
#[async_trait]
pub trait ProjectSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}
