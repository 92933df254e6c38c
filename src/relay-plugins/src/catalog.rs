//! Published plugin catalog snapshots.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::CommandInfo;
use crate::manifest::ManifestSource;

/// Load state of a discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// Entry resolved and module registered.
    Loaded,

    /// No renderer entry in the manifest; never loaded.
    Skipped,

    /// Loading failed; other plugins are unaffected.
    Failed { error: String },
}

/// One plugin as seen by catalog subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPlugin {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub source: ManifestSource,
    pub load_state: LoadState,
}

/// The externally observable, immutable view of the plugin runtime.
/// Recomputed and republished whenever directories, discovered plugins, or
/// the registered-command set change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCatalogSnapshot {
    /// Directories the last sync scanned, normalized.
    pub directories: Vec<PathBuf>,

    /// Discovered plugins with their load state.
    pub plugins: Vec<CatalogPlugin>,

    /// Registered commands.
    pub commands: Vec<CommandInfo>,

    /// Discovery and registration warnings.
    pub warnings: Vec<String>,

    /// When this snapshot was computed.
    pub synced_at: DateTime<Utc>,
}

impl PluginCatalogSnapshot {
    /// An empty snapshot, published before the first sync.
    pub fn empty() -> Self {
        Self {
            directories: Vec::new(),
            plugins: Vec::new(),
            commands: Vec::new(),
            warnings: Vec::new(),
            synced_at: Utc::now(),
        }
    }

    /// Count of plugins in the `Loaded` state.
    pub fn loaded_count(&self) -> usize {
        self.plugins
            .iter()
            .filter(|p| p.load_state == LoadState::Loaded)
            .count()
    }

    /// Count of plugins in the `Failed` state.
    pub fn failed_count(&self) -> usize {
        self.plugins
            .iter()
            .filter(|p| matches!(p.load_state, LoadState::Failed { .. }))
            .count()
    }
}
