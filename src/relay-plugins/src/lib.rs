//! # Relay Plugin Runtime
//!
//! An extensible plugin layer for Relay sessions: plugins are discovered
//! from configured directories, loaded through a pluggable module host, and
//! extend the runtime through lifecycle hooks, slash commands, and prompt
//! transformers.
//!
//! ## Features
//!
//! - **Discovery**: Directory scanning with a three-tier manifest convention
//!   (`relay-plugin.json`, `plugin.json`, hinted `package.json`)
//! - **Hook System**: Ordered, failure-isolated lifecycle hooks around
//!   messages, tool calls, and agent runs
//! - **Custom Commands**: Case-insensitive slash commands with a built-in
//!   `/plugins` management command
//! - **Prompt Transformers**: An ordered rewrite/cancel chain over outgoing
//!   prompts
//! - **Hot Reload**: Rescans dispose and reload plugins whose entry file
//!   changed
//!
//! ## Plugin Structure
//!
//! ```text
//! my-plugin/
//! ├── relay-plugin.json   # Plugin manifest
//! ├── index.js            # Renderer entry named by the manifest
//! └── README.md           # Optional documentation
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relay_plugins::{NativeModuleHost, PluginRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let host = Arc::new(NativeModuleHost::new());
//!     let runtime = PluginRuntime::new(host).await;
//!
//!     let snapshot = runtime.sync_catalog(&[dirs::home_dir().unwrap().join(".relay/plugins")]).await;
//!     for plugin in &snapshot.plugins {
//!         println!("{} v{}", plugin.name, plugin.version);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod commands;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod host;
pub mod manifest;
pub mod runtime;
pub mod transformers;

// Re-exports for convenience
pub use api::{LogLevel, PluginApi, PluginMeta};
pub use catalog::{CatalogPlugin, LoadState, PluginCatalogSnapshot};
pub use commands::{
    CommandContext, CommandHandler, CommandInfo, CommandOutcome, CommandReply,
    normalize_command_name,
};
pub use discovery::{DiscoveredPlugin, DiscoveryOutcome};
pub use error::{PluginError, Result};
pub use hooks::{HookContext, HookEvent, HookHandler, HookPayload, HookRegistry};
pub use host::{
    LoadToken, LoadedPluginInstance, ModuleCleanup, ModuleFactory, ModuleHost, NativeModuleHost,
    PluginModule,
};
pub use manifest::{ManifestSource, PluginManifest};
pub use runtime::{BUILTIN_PLUGIN_ID, PluginRuntime};
pub use transformers::{
    PromptTransformer, TransformContext, TransformDecision, TransformOutcome, TransformerRegistry,
};
