//! Workspace context snapshot and rendering.
//!
//! The snapshot itself comes from an external provider (git status, directory
//! listing, manifest inspection are all outside this crate); the pipeline
//! fetches it best-effort and renders it as one prompt block.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Best-effort description of the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// Current VCS branch, when the directory is a repository.
    pub branch: Option<String>,

    /// Count of files with uncommitted changes.
    pub dirty_files: usize,

    /// Top-level directory entries.
    pub top_level: Vec<String>,

    /// Notable files (readme, manifests, CI config).
    pub key_files: Vec<String>,

    /// Script/task names exposed by the project.
    pub scripts: Vec<String>,

    /// Detected technologies ("rust", "node", ...).
    pub tech_hints: Vec<String>,
}

impl WorkspaceSnapshot {
    /// Render the snapshot as a prompt block. Empty fields are left out.
    pub fn render(&self) -> String {
        let mut lines = vec!["[Workspace context]".to_string()];
        if let Some(branch) = &self.branch {
            lines.push(format!("Branch: {branch} ({} dirty files)", self.dirty_files));
        }
        if !self.top_level.is_empty() {
            lines.push(format!("Top-level: {}", self.top_level.join(", ")));
        }
        if !self.key_files.is_empty() {
            lines.push(format!("Key files: {}", self.key_files.join(", ")));
        }
        if !self.scripts.is_empty() {
            lines.push(format!("Scripts: {}", self.scripts.join(", ")));
        }
        if !self.tech_hints.is_empty() {
            lines.push(format!("Tech: {}", self.tech_hints.join(", ")));
        }
        lines.join("\n")
    }
}

/// Produces workspace snapshots for a working directory.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    async fn snapshot(&self, directory: &Path) -> Result<WorkspaceSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_skips_empty_fields() {
        let snapshot = WorkspaceSnapshot {
            branch: Some("main".into()),
            dirty_files: 2,
            top_level: vec!["src".into(), "Cargo.toml".into()],
            ..Default::default()
        };
        assert_eq!(
            snapshot.render(),
            "[Workspace context]\nBranch: main (2 dirty files)\nTop-level: src, Cargo.toml"
        );
    }
}
