//! Plugin system error types.

use std::path::PathBuf;

use thiserror::Error;

/// Plugin system errors.
#[derive(Error, Debug)]
pub enum PluginError {
    /// A configured plugin directory is missing or not a directory.
    #[error("Plugin directory unusable: {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    /// Plugin entry failed to load.
    #[error("Failed to load plugin '{plugin}': {message}")]
    LoadError { plugin: String, message: String },

    /// Invalid plugin manifest.
    #[error("Invalid manifest for plugin '{plugin}': {message}")]
    InvalidManifest { plugin: String, message: String },

    /// Plugin entry is not a regular file.
    #[error("Plugin entry is not a file: {0}")]
    EntryNotAFile(PathBuf),

    /// No module registered for an entry path.
    #[error("No module available for entry: {0}")]
    NoModule(PathBuf),

    /// Command error.
    #[error("Command error: {0}")]
    CommandError(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PluginError {
    /// Create a load error.
    pub fn load_error(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadError {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create an invalid manifest error.
    pub fn invalid_manifest(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
