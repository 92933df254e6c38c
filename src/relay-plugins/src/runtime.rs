//! The plugin runtime: discovery, load/unload reconciliation, registries,
//! and catalog publication.
//!
//! All registry state lives inside one `PluginRuntime` value; there are no
//! ambient globals. The runtime assumes a single logical execution context:
//! syncs are serialized behind one state lock, and hook/transformer dispatch
//! is sequential and awaited.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, watch};

use crate::api::{PluginApi, PluginMeta};
use crate::catalog::{CatalogPlugin, LoadState, PluginCatalogSnapshot};
use crate::commands::{
    CommandContext, CommandHandler, CommandOutcome, CommandRegistry, CommandReply,
    RegisteredCommand,
};
use crate::discovery::{self, DiscoveredPlugin};
use crate::error::{PluginError, Result};
use crate::hooks::{HookContext, HookPayload, HookRegistry};
use crate::host::{LoadToken, LoadedPluginInstance, ModuleHost};
use crate::transformers::{TransformContext, TransformOutcome, TransformerRegistry};

/// Reserved plugin id for runtime-provided commands.
pub const BUILTIN_PLUGIN_ID: &str = "builtin";

struct LoadedEntry {
    plugin_id: String,
    instance: LoadedPluginInstance,
}

#[derive(Default)]
struct SyncState {
    directories: Vec<PathBuf>,
    signature: Option<String>,
    discovered: Vec<DiscoveredPlugin>,
    /// Discovery + registration warnings from the last sync.
    warnings: Vec<String>,
    /// Loaded instances keyed by manifest path.
    loaded: HashMap<PathBuf, LoadedEntry>,
    /// Last load error per manifest path.
    load_errors: HashMap<PathBuf, String>,
}

/// Owns plugin discovery, loading, and the hook/command/transformer
/// registries.
pub struct PluginRuntime {
    host: Arc<dyn ModuleHost>,
    hooks: Arc<HookRegistry>,
    commands: Arc<CommandRegistry>,
    transformers: Arc<TransformerRegistry>,
    /// Registration id counter; ids are never reused.
    ids: Arc<AtomicU64>,
    state: RwLock<SyncState>,
    catalog_tx: watch::Sender<Arc<PluginCatalogSnapshot>>,
}

impl PluginRuntime {
    /// Create a runtime and register the built-in commands.
    pub async fn new(host: Arc<dyn ModuleHost>) -> Arc<Self> {
        let (catalog_tx, _) = watch::channel(Arc::new(PluginCatalogSnapshot::empty()));
        let runtime = Arc::new(Self {
            host,
            hooks: Arc::new(HookRegistry::new()),
            commands: Arc::new(CommandRegistry::new()),
            transformers: Arc::new(TransformerRegistry::new()),
            ids: Arc::new(AtomicU64::new(1)),
            state: RwLock::new(SyncState::default()),
            catalog_tx,
        });
        runtime.register_builtin_commands().await;
        // The built-ins are executable immediately, so the initial snapshot
        // must already list them.
        let initial = {
            let state = runtime.state.read().await;
            Arc::new(runtime.build_snapshot(&state).await)
        };
        runtime.catalog_tx.send_replace(initial);
        runtime
    }

    // ========== Catalog sync ==========

    /// Reconcile the runtime against `directories`. For an unchanged
    /// normalized directory signature this is a complete no-op that returns
    /// the previous snapshot.
    pub async fn sync_catalog(self: &Arc<Self>, directories: &[PathBuf]) -> Arc<PluginCatalogSnapshot> {
        self.sync_inner(directories, false).await
    }

    /// Re-run reconciliation over the current directories, ignoring the
    /// signature guard.
    pub async fn force_rescan(self: &Arc<Self>) -> Arc<PluginCatalogSnapshot> {
        let directories = self.state.read().await.directories.clone();
        self.sync_inner(&directories, true).await
    }

    async fn sync_inner(&self, directories: &[PathBuf], force: bool) -> Arc<PluginCatalogSnapshot> {
        let normalized: Vec<PathBuf> = directories.iter().map(|d| normalize_dir(d)).collect();
        let signature = normalized
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let mut state = self.state.write().await;
        if !force && state.signature.as_deref() == Some(signature.as_str()) {
            return self.catalog_tx.borrow().clone();
        }

        let outcome = discovery::discover(&normalized).await;
        let mut warnings = outcome.warnings;

        // Desired entry path per manifest path. `None` marks entry-less
        // plugins, which are never loaded.
        let desired: HashMap<PathBuf, Option<PathBuf>> = outcome
            .plugins
            .iter()
            .map(|p| {
                let entry = p
                    .renderer_entry
                    .as_deref()
                    .map(|e| resolve_entry(&p.root, e));
                (p.manifest_path.clone(), entry)
            })
            .collect();

        // Unload pass: anything no longer desired, or whose resolved entry
        // or load token changed, is disposed before reloading.
        let mut to_dispose = Vec::new();
        for (manifest_path, entry) in state.loaded.iter() {
            let keep = match desired.get(manifest_path) {
                Some(Some(desired_entry)) if *desired_entry == entry.instance.entry => {
                    match LoadToken::for_file(desired_entry).await {
                        Ok(token) => token == entry.instance.token,
                        Err(_) => false,
                    }
                }
                _ => false,
            };
            if !keep {
                to_dispose.push(manifest_path.clone());
            }
        }
        for manifest_path in to_dispose {
            if let Some(entry) = state.loaded.remove(&manifest_path) {
                entry.instance.dispose(&entry.plugin_id).await;
            }
        }

        // Stale error records vanish with their plugins.
        state
            .load_errors
            .retain(|manifest_path, _| desired.contains_key(manifest_path));

        // Load pass. One plugin's failure never blocks the others.
        for plugin in &outcome.plugins {
            let Some(Some(entry)) = desired.get(&plugin.manifest_path) else {
                continue;
            };
            if state.loaded.contains_key(&plugin.manifest_path) {
                continue;
            }
            match self.load_plugin(plugin, entry).await {
                Ok((instance, mut reg_warnings)) => {
                    warnings.append(&mut reg_warnings);
                    state.load_errors.remove(&plugin.manifest_path);
                    state.loaded.insert(
                        plugin.manifest_path.clone(),
                        LoadedEntry {
                            plugin_id: plugin.id.clone(),
                            instance,
                        },
                    );
                    tracing::info!(plugin_id = %plugin.id, entry = %entry.display(), "loaded plugin");
                }
                Err(e) => {
                    tracing::warn!(plugin_id = %plugin.id, error = %e, "failed to load plugin");
                    state
                        .load_errors
                        .insert(plugin.manifest_path.clone(), e.to_string());
                }
            }
        }

        state.directories = normalized;
        state.signature = Some(signature);
        state.discovered = outcome.plugins;
        state.warnings = warnings;

        let snapshot = Arc::new(self.build_snapshot(&state).await);
        self.catalog_tx.send_replace(snapshot.clone());
        snapshot
    }

    async fn load_plugin(
        &self,
        plugin: &DiscoveredPlugin,
        entry: &Path,
    ) -> Result<(LoadedPluginInstance, Vec<String>)> {
        let token = LoadToken::for_file(entry).await?;
        let module = self.host.resolve(&token).await?;

        let mut api = PluginApi::new(
            PluginMeta {
                id: plugin.id.clone(),
                name: plugin.name.clone(),
                version: plugin.version.clone(),
            },
            self.hooks.clone(),
            self.commands.clone(),
            self.transformers.clone(),
            self.ids.clone(),
        );
        let cleanup = module
            .register(&mut api)
            .await
            .map_err(|e| PluginError::load_error(&plugin.id, e.to_string()))?;
        let (disposers, warnings) = api.into_parts();

        Ok((
            LoadedPluginInstance {
                entry: entry.to_path_buf(),
                token,
                disposers,
                cleanup,
            },
            warnings,
        ))
    }

    async fn build_snapshot(&self, state: &SyncState) -> PluginCatalogSnapshot {
        let plugins = state
            .discovered
            .iter()
            .map(|p| {
                let load_state = if state.loaded.contains_key(&p.manifest_path) {
                    LoadState::Loaded
                } else if let Some(error) = state.load_errors.get(&p.manifest_path) {
                    LoadState::Failed {
                        error: error.clone(),
                    }
                } else {
                    LoadState::Skipped
                };
                CatalogPlugin {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    version: p.version.clone(),
                    description: p.description.clone(),
                    root: p.root.clone(),
                    manifest_path: p.manifest_path.clone(),
                    source: p.source,
                    load_state,
                }
            })
            .collect();

        PluginCatalogSnapshot {
            directories: state.directories.clone(),
            plugins,
            commands: self.commands.list().await,
            warnings: state.warnings.clone(),
            synced_at: Utc::now(),
        }
    }

    // ========== Dispatch surface ==========

    /// Emit a lifecycle hook. Handler failures are isolated; callers are
    /// never blocked by them beyond the sequential await.
    pub async fn emit_hook(&self, ctx: &HookContext, payload: &HookPayload) {
        self.hooks.emit(ctx, payload).await;
    }

    /// Execute a slash command by name.
    pub async fn execute_command(&self, name: &str, ctx: &CommandContext) -> CommandOutcome {
        self.commands.execute(name, ctx).await
    }

    /// Run the prompt transformer chain.
    pub async fn apply_prompt_transformers(
        &self,
        ctx: &TransformContext,
        prompt: &str,
    ) -> TransformOutcome {
        self.transformers.apply(ctx, prompt).await
    }

    // ========== Observation ==========

    /// Current catalog snapshot.
    pub fn snapshot(&self) -> Arc<PluginCatalogSnapshot> {
        self.catalog_tx.borrow().clone()
    }

    /// Subscribe to catalog snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PluginCatalogSnapshot>> {
        self.catalog_tx.subscribe()
    }

    /// Hook registry handle.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Transformer registry handle.
    pub fn transformer_registry(&self) -> &Arc<TransformerRegistry> {
        &self.transformers
    }

    // ========== Built-in commands ==========

    async fn register_builtin_commands(self: &Arc<Self>) {
        let plugins_cmd = RegisteredCommand {
            id: self.ids.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            name: "plugins".into(),
            plugin_id: BUILTIN_PLUGIN_ID.into(),
            description: Some("List plugins, commands, and transformers; 'reload' rescans first".into()),
            handler: Arc::new(PluginsCommand {
                runtime: Arc::downgrade(self),
            }),
        };
        let reload_cmd = RegisteredCommand {
            id: self.ids.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            name: "plugins-reload".into(),
            plugin_id: BUILTIN_PLUGIN_ID.into(),
            description: Some("Rescan plugin directories and reload changed plugins".into()),
            handler: Arc::new(PluginsReloadCommand {
                runtime: Arc::downgrade(self),
            }),
        };
        self.commands.register(plugins_cmd).await;
        self.commands.register(reload_cmd).await;
    }
}

/// `/plugins [reload|rescan]`
struct PluginsCommand {
    runtime: std::sync::Weak<PluginRuntime>,
}

#[async_trait]
impl CommandHandler for PluginsCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandReply> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("plugin runtime is gone"))?;

        let rescan = matches!(
            ctx.args.first().map(String::as_str),
            Some("reload") | Some("rescan")
        );
        let snapshot = if rescan {
            runtime.force_rescan().await
        } else {
            runtime.snapshot()
        };

        let mut lines = Vec::new();
        lines.push(format!(
            "Plugins: {} loaded, {} failed, {} discovered",
            snapshot.loaded_count(),
            snapshot.failed_count(),
            snapshot.plugins.len()
        ));
        for plugin in &snapshot.plugins {
            let state = match &plugin.load_state {
                LoadState::Loaded => "loaded".to_string(),
                LoadState::Skipped => "skipped (no entry)".to_string(),
                LoadState::Failed { error } => format!("failed: {error}"),
            };
            lines.push(format!("  {} v{} - {}", plugin.name, plugin.version, state));
        }
        lines.push(format!("Commands: {}", snapshot.commands.len()));
        for command in &snapshot.commands {
            match &command.description {
                Some(desc) => lines.push(format!("  /{} - {}", command.name, desc)),
                None => lines.push(format!("  /{}", command.name)),
            }
        }
        lines.push(format!(
            "Prompt transformers: {}",
            runtime.transformers.count().await
        ));
        Ok(CommandReply::message(lines.join("\n")))
    }
}

/// `/plugins-reload`
struct PluginsReloadCommand {
    runtime: std::sync::Weak<PluginRuntime>,
}

#[async_trait]
impl CommandHandler for PluginsReloadCommand {
    async fn execute(&self, _ctx: &CommandContext) -> anyhow::Result<CommandReply> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("plugin runtime is gone"))?;
        let snapshot = runtime.force_rescan().await;
        Ok(CommandReply::message(format!(
            "Plugins reloaded: {} loaded, {} failed, {} commands",
            snapshot.loaded_count(),
            snapshot.failed_count(),
            snapshot.commands.len()
        )))
    }
}

/// Expand a leading `~` and drop trailing separators so equal directories
/// produce equal signatures.
fn normalize_dir(path: &Path) -> PathBuf {
    expand_tilde(path).components().collect()
}

/// Resolve a manifest entry to an absolute path: tilde expansion first, then
/// relative-to-root resolution.
fn resolve_entry(root: &Path, entry: &str) -> PathBuf {
    let expanded = expand_tilde(Path::new(entry));
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if s == "~" {
        return dirs::home_dir().unwrap_or_else(|| path.to_path_buf());
    }
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
