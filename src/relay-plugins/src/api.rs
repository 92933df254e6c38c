//! The API object handed to a plugin module during registration.
//!
//! Everything a module registers through its API instance is tracked, so
//! disposing the plugin also disposes its hooks, commands, and transformers
//! in reverse registration order, before the module's own cleanup runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::commands::{CommandHandler, CommandRegistry, RegisteredCommand};
use crate::hooks::{HookEvent, HookHandler, HookRegistry};
use crate::host::Disposer;
use crate::transformers::{PromptTransformer, RegisteredTransformer, TransformerRegistry};

/// Read-only plugin metadata exposed to the module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMeta {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Registration surface for one plugin module.
pub struct PluginApi {
    meta: PluginMeta,
    hooks: Arc<HookRegistry>,
    commands: Arc<CommandRegistry>,
    transformers: Arc<TransformerRegistry>,
    /// Runtime-wide id/sequence counter; ids are never reused.
    ids: Arc<AtomicU64>,
    disposers: Vec<Disposer>,
    warnings: Vec<String>,
}

impl PluginApi {
    pub(crate) fn new(
        meta: PluginMeta,
        hooks: Arc<HookRegistry>,
        commands: Arc<CommandRegistry>,
        transformers: Arc<TransformerRegistry>,
        ids: Arc<AtomicU64>,
    ) -> Self {
        Self {
            meta,
            hooks,
            commands,
            transformers,
            ids,
            disposers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Read-only plugin metadata.
    pub fn plugin(&self) -> &PluginMeta {
        &self.meta
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a lifecycle hook. Lower `order` runs first; ties resolve by
    /// registration sequence.
    pub async fn register_hook(
        &mut self,
        event: HookEvent,
        handler: Arc<dyn HookHandler>,
        order: i32,
    ) {
        let id = self.next_id();
        self.hooks
            .register(event, &self.meta.id, handler, order, id, id)
            .await;

        let hooks = self.hooks.clone();
        self.disposers.push(Box::new(move || {
            Box::pin(async move {
                hooks.unregister(event, id).await;
            })
        }));
    }

    /// Alias for [`register_hook`](Self::register_hook).
    pub async fn on(&mut self, event: HookEvent, handler: Arc<dyn HookHandler>, order: i32) {
        self.register_hook(event, handler, order).await;
    }

    /// Register a slash command. Name conflicts replace the earlier command
    /// and surface as a catalog warning; invalid names are dropped with a
    /// warning.
    pub async fn register_command(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        handler: Arc<dyn CommandHandler>,
    ) {
        let id = self.next_id();
        let name = name.into();
        let warning = self
            .commands
            .register(RegisteredCommand {
                id,
                name: name.clone(),
                plugin_id: self.meta.id.clone(),
                description,
                handler,
            })
            .await;
        if let Some(warning) = warning {
            self.warnings.push(warning);
        }

        let commands = self.commands.clone();
        let normalized = crate::commands::normalize_command_name(&name);
        self.disposers.push(Box::new(move || {
            Box::pin(async move {
                if let Some(name) = normalized {
                    commands.unregister(&name, id).await;
                }
            })
        }));
    }

    /// Register a prompt transformer.
    pub async fn register_prompt_transformer(
        &mut self,
        transformer: Arc<dyn PromptTransformer>,
        order: i32,
    ) {
        let id = self.next_id();
        self.transformers
            .register(RegisteredTransformer {
                id,
                plugin_id: self.meta.id.clone(),
                order,
                seq: id,
                transformer,
            })
            .await;

        let transformers = self.transformers.clone();
        self.disposers.push(Box::new(move || {
            Box::pin(async move {
                transformers.unregister(id).await;
            })
        }));
    }

    /// Structured plugin logging, routed through the host's tracing.
    pub fn log(&self, level: LogLevel, event: &str, payload: serde_json::Value) {
        let plugin_id = self.meta.id.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(plugin_id, event, %payload, "plugin log"),
            LogLevel::Debug => tracing::debug!(plugin_id, event, %payload, "plugin log"),
            LogLevel::Info => tracing::info!(plugin_id, event, %payload, "plugin log"),
            LogLevel::Warn => tracing::warn!(plugin_id, event, %payload, "plugin log"),
            LogLevel::Error => tracing::error!(plugin_id, event, %payload, "plugin log"),
        }
    }

    /// Consume the API instance after registration: the collected disposers
    /// (registration order) and any warnings produced.
    pub(crate) fn into_parts(self) -> (Vec<Disposer>, Vec<String>) {
        (self.disposers, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandContext, CommandOutcome, CommandReply};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl CommandHandler for Silent {
        async fn execute(&self, _ctx: &CommandContext) -> anyhow::Result<CommandReply> {
            Ok(CommandReply::silent())
        }
    }

    struct NopHook;

    #[async_trait]
    impl crate::hooks::HookHandler for NopHook {
        async fn handle(
            &self,
            _ctx: &crate::hooks::HookContext,
            _payload: &crate::hooks::HookPayload,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn api() -> (PluginApi, Arc<HookRegistry>, Arc<CommandRegistry>, Arc<TransformerRegistry>) {
        let hooks = Arc::new(HookRegistry::new());
        let commands = Arc::new(CommandRegistry::new());
        let transformers = Arc::new(TransformerRegistry::new());
        let api = PluginApi::new(
            PluginMeta {
                id: "test-plugin".into(),
                name: "Test".into(),
                version: "1.0.0".into(),
            },
            hooks.clone(),
            commands.clone(),
            transformers.clone(),
            Arc::new(AtomicU64::new(0)),
        );
        (api, hooks, commands, transformers)
    }

    #[tokio::test]
    async fn test_disposers_remove_registrations() {
        let (mut api, hooks, commands, transformers) = api();
        api.register_hook(HookEvent::SessionStart, Arc::new(NopHook), 0)
            .await;
        api.register_command("demo", None, Arc::new(Silent)).await;
        api.register_prompt_transformer(
            Arc::new(crate::transformers::tests_support::PassThrough),
            0,
        )
        .await;

        let (disposers, warnings) = api.into_parts();
        assert_eq!(disposers.len(), 3);
        assert!(warnings.is_empty());

        for disposer in disposers.into_iter().rev() {
            disposer().await;
        }
        assert_eq!(hooks.handler_count(HookEvent::SessionStart).await, 0);
        assert!(commands.list().await.is_empty());
        assert_eq!(transformers.count().await, 0);
        assert_eq!(
            commands.execute("demo", &CommandContext::default()).await,
            CommandOutcome::NotHandled
        );
    }

    #[tokio::test]
    async fn test_invalid_command_name_warns() {
        let (mut api, _, commands, _) = api();
        api.register_command("not a name", None, Arc::new(Silent)).await;
        let (_, warnings) = api.into_parts();
        assert_eq!(warnings.len(), 1);
        assert!(commands.list().await.is_empty());
    }
}
