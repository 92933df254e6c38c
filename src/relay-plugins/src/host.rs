//! Module loading contract.
//!
//! Hot dynamic-code loading is not something Rust does natively, so the
//! runtime loads plugin modules through the [`ModuleHost`] abstraction: the
//! host maps a resolved entry path to a [`PluginModule`] implementation.
//! [`NativeModuleHost`] is the in-process host backed by registered
//! factories; alternative hosts (subprocess-isolated, scripted) implement the
//! same trait.
//!
//! Reload detection uses a [`LoadToken`] derived from the entry file's
//! modification time: a rescan that sees a newer mtime disposes the old
//! instance and loads the module again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::api::PluginApi;
use crate::error::{PluginError, Result};

/// Undoes one registration made through a [`PluginApi`]. Infallible.
pub type Disposer = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + Sync>;

/// Module-level cleanup returned from [`PluginModule::register`].
pub type ModuleCleanup = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Cache-busting identity of a loaded entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadToken {
    /// Resolved absolute entry path.
    pub entry: PathBuf,

    /// Entry mtime in milliseconds since the epoch; 0 when unavailable.
    pub mtime_ms: u128,
}

impl LoadToken {
    /// Stat `entry` and build its token. Fails when the path is missing or
    /// not a regular file.
    pub async fn for_file(entry: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(entry)
            .await
            .map_err(|_| PluginError::EntryNotAFile(entry.to_path_buf()))?;
        if !meta.is_file() {
            return Err(PluginError::EntryNotAFile(entry.to_path_buf()));
        }
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis());
        Ok(Self {
            entry: entry.to_path_buf(),
            mtime_ms,
        })
    }

    /// Identifier that changes whenever the entry file is edited.
    pub fn cache_key(&self) -> String {
        format!("{}?v={}", self.entry.display(), self.mtime_ms)
    }
}

/// A loadable plugin module. The Rust mirror of a JS module's default /
/// `register` export: it receives the API object and may hand back a
/// module-level cleanup.
#[async_trait]
pub trait PluginModule: Send + Sync {
    async fn register(&self, api: &mut PluginApi) -> anyhow::Result<Option<ModuleCleanup>>;
}

/// Resolves entry paths to module implementations.
#[async_trait]
pub trait ModuleHost: Send + Sync {
    async fn resolve(&self, token: &LoadToken) -> Result<Arc<dyn PluginModule>>;
}

/// Factory producing a fresh module instance per load.
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn PluginModule> + Send + Sync>;

/// In-process host: modules are provided as factories keyed by entry file
/// name. Every load calls the factory again, so a rescan after an entry edit
/// observes fresh module state.
pub struct NativeModuleHost {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl NativeModuleHost {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory for an entry file name (e.g. `index.js`).
    pub async fn register_factory(&self, entry_file_name: impl Into<String>, factory: ModuleFactory) {
        self.factories
            .write()
            .await
            .insert(entry_file_name.into(), factory);
    }
}

impl Default for NativeModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleHost for NativeModuleHost {
    async fn resolve(&self, token: &LoadToken) -> Result<Arc<dyn PluginModule>> {
        let name = token
            .entry
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PluginError::NoModule(token.entry.clone()))?;
        let factories = self.factories.read().await;
        let factory = factories
            .get(name)
            .ok_or_else(|| PluginError::NoModule(token.entry.clone()))?;
        Ok(factory())
    }
}

/// A successfully loaded plugin: its entry identity plus one composed dispose
/// path. Destroyed on reconciliation when the resolved entry changes or
/// disappears.
pub struct LoadedPluginInstance {
    /// Entry path that was loaded.
    pub entry: PathBuf,

    /// Token captured at load time.
    pub token: LoadToken,

    /// Per-registration disposers, run in reverse registration order.
    pub(crate) disposers: Vec<Disposer>,

    /// Module's own cleanup, run after the disposers.
    pub(crate) cleanup: Option<ModuleCleanup>,
}

impl LoadedPluginInstance {
    /// Tear the instance down. Failures are logged, never propagated.
    pub async fn dispose(self, plugin_id: &str) {
        for disposer in self.disposers.into_iter().rev() {
            disposer().await;
        }
        if let Some(cleanup) = self.cleanup {
            if let Err(e) = cleanup().await {
                tracing::warn!(plugin_id, error = %e, "plugin cleanup failed");
            }
        }
        tracing::debug!(plugin_id, "disposed plugin instance");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    #[async_trait]
    impl PluginModule for Nop {
        async fn register(&self, _api: &mut PluginApi) -> anyhow::Result<Option<ModuleCleanup>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_token_requires_regular_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            LoadToken::for_file(tmp.path()).await,
            Err(PluginError::EntryNotAFile(_))
        ));
        assert!(matches!(
            LoadToken::for_file(&tmp.path().join("missing.js")).await,
            Err(PluginError::EntryNotAFile(_))
        ));

        let entry = tmp.path().join("index.js");
        tokio::fs::write(&entry, "// entry").await.unwrap();
        let token = LoadToken::for_file(&entry).await.unwrap();
        assert!(token.cache_key().contains("?v="));
    }

    #[tokio::test]
    async fn test_token_changes_with_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("index.js");
        tokio::fs::write(&entry, "v1").await.unwrap();
        let first = LoadToken::for_file(&entry).await.unwrap();

        // Force a different mtime rather than relying on clock resolution.
        let file = std::fs::File::options().write(true).open(&entry).unwrap();
        file.set_modified(UNIX_EPOCH + std::time::Duration::from_secs(42))
            .unwrap();
        let second = LoadToken::for_file(&entry).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_native_host_resolution() {
        let host = NativeModuleHost::new();
        host.register_factory("index.js", Arc::new(|| Arc::new(Nop) as Arc<dyn PluginModule>))
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("index.js");
        tokio::fs::write(&entry, "// entry").await.unwrap();
        let token = LoadToken::for_file(&entry).await.unwrap();
        assert!(host.resolve(&token).await.is_ok());

        let other = tmp.path().join("other.js");
        tokio::fs::write(&other, "// entry").await.unwrap();
        let token = LoadToken::for_file(&other).await.unwrap();
        assert!(matches!(
            host.resolve(&token).await,
            Err(PluginError::NoModule(_))
        ));
    }
}
