//! Plugin slash-command registry.
//!
//! Command names are case-insensitive and charset-restricted. Exactly one
//! command holds a normalized name at a time; a later registration replaces
//! the earlier one and produces a warning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Normalize a requested command name: trim, strip one leading `/`,
/// lowercase. Returns `None` when the result is empty or contains characters
/// outside `[a-z0-9._-]`.
pub fn normalize_command_name(name: &str) -> Option<String> {
    let name = name.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    let name = name.to_lowercase();
    if name.is_empty() {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return None;
    }
    Some(name)
}

/// Context handed to a command executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandContext {
    /// Current session ID.
    pub session_id: Option<String>,

    /// Workspace directory.
    pub workspace_directory: PathBuf,

    /// Owning agent, when known.
    pub agent_id: Option<String>,

    /// The raw message the command was typed in.
    pub raw_message: String,

    /// Whitespace-split arguments after the command name.
    pub args: Vec<String>,

    /// Names of attached files, if any.
    pub attachment_names: Vec<String>,

    /// Resolved mention paths, if any.
    pub mention_paths: Vec<String>,
}

/// What a command produced for the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    /// Message shown to the user, if any.
    pub message: Option<String>,

    /// Whether the reply is an error.
    pub is_error: bool,
}

impl CommandReply {
    /// A plain informational reply.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            is_error: false,
        }
    }

    /// An error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            is_error: true,
        }
    }

    /// A reply with no chat output.
    pub fn silent() -> Self {
        Self {
            message: None,
            is_error: false,
        }
    }
}

/// Result of routing a message through the command registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// No command with that name; the caller should treat the message as a
    /// normal prompt.
    NotHandled,

    /// A command ran (successfully or not) and produced this reply.
    Handled(CommandReply),
}

/// Command executor.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandReply>;
}

/// A registered command.
#[derive(Clone)]
pub(crate) struct RegisteredCommand {
    pub id: u64,
    pub name: String,
    pub plugin_id: String,
    pub description: Option<String>,
    pub handler: Arc<dyn CommandHandler>,
}

/// Catalog-facing command description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub plugin_id: String,
    pub description: Option<String>,
}

/// Registry of plugin commands keyed by normalized name.
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, RegisteredCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// Register a command under its normalized name. Returns a warning string
    /// when an earlier registration was replaced, and an error-shaped warning
    /// when the name itself is invalid (the registration is then dropped).
    pub(crate) async fn register(&self, command: RegisteredCommand) -> Option<String> {
        let Some(name) = normalize_command_name(&command.name) else {
            let warning = format!(
                "Plugin '{}' tried to register invalid command name '{}'",
                command.plugin_id, command.name
            );
            tracing::warn!("{warning}");
            return Some(warning);
        };

        let mut commands = self.commands.write().await;
        let replaced = commands.insert(
            name.clone(),
            RegisteredCommand {
                name: name.clone(),
                ..command
            },
        );
        match replaced {
            Some(old) => {
                let warning = format!(
                    "Command '/{name}' from plugin '{}' replaces registration from plugin '{}'",
                    commands[&name].plugin_id, old.plugin_id
                );
                tracing::warn!("{warning}");
                Some(warning)
            }
            None => {
                tracing::debug!(command = %name, plugin_id = %commands[&name].plugin_id, "registered command");
                None
            }
        }
    }

    /// Remove one registration by id, but only if it still owns its name.
    pub(crate) async fn unregister(&self, name: &str, id: u64) {
        let mut commands = self.commands.write().await;
        if commands.get(name).is_some_and(|c| c.id == id) {
            commands.remove(name);
        }
    }

    /// Execute a command by (unnormalized) name. Invalid or unknown names are
    /// `NotHandled`; executor failures become error replies, never panics or
    /// propagated errors.
    pub async fn execute(&self, name: &str, ctx: &CommandContext) -> CommandOutcome {
        let Some(normalized) = normalize_command_name(name) else {
            return CommandOutcome::NotHandled;
        };
        let handler = {
            let commands = self.commands.read().await;
            match commands.get(&normalized) {
                Some(command) => command.handler.clone(),
                None => return CommandOutcome::NotHandled,
            }
        };

        match handler.execute(ctx).await {
            Ok(reply) => CommandOutcome::Handled(reply),
            Err(e) => {
                tracing::warn!(command = %normalized, error = %e, "command execution failed");
                CommandOutcome::Handled(CommandReply::error(format!(
                    "Command '/{normalized}' failed: {e}"
                )))
            }
        }
    }

    /// List registered commands, sorted by name.
    pub async fn list(&self) -> Vec<CommandInfo> {
        let commands = self.commands.read().await;
        let mut infos: Vec<_> = commands
            .values()
            .map(|c| CommandInfo {
                name: c.name.clone(),
                plugin_id: c.plugin_id.clone(),
                description: c.description.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandReply> {
            Ok(CommandReply::message(format!("args: {:?}", ctx.args)))
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        async fn execute(&self, _ctx: &CommandContext) -> anyhow::Result<CommandReply> {
            anyhow::bail!("no dice")
        }
    }

    fn command(id: u64, name: &str, plugin_id: &str, handler: Arc<dyn CommandHandler>) -> RegisteredCommand {
        RegisteredCommand {
            id,
            name: name.to_string(),
            plugin_id: plugin_id.to_string(),
            description: None,
            handler,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_command_name(" /Plugins "), Some("plugins".into()));
        assert_eq!(normalize_command_name("re-scan.v2_x"), Some("re-scan.v2_x".into()));
        assert_eq!(normalize_command_name("/"), None);
        assert_eq!(normalize_command_name("has space"), None);
        assert_eq!(normalize_command_name("bad!"), None);
        assert_eq!(normalize_command_name(""), None);
    }

    #[tokio::test]
    async fn test_execute_case_insensitive_slash_optional() {
        let registry = CommandRegistry::new();
        registry.register(command(1, "hello", "p1", Arc::new(Echo))).await;

        for spelling in ["hello", "/hello", " /Hello "] {
            let outcome = registry.execute(spelling, &CommandContext::default()).await;
            assert!(matches!(outcome, CommandOutcome::Handled(_)), "{spelling}");
        }
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_names_not_handled() {
        let registry = CommandRegistry::new();
        assert_eq!(
            registry.execute("nope", &CommandContext::default()).await,
            CommandOutcome::NotHandled
        );
        assert_eq!(
            registry.execute("not valid", &CommandContext::default()).await,
            CommandOutcome::NotHandled
        );
    }

    #[tokio::test]
    async fn test_replacement_warns() {
        let registry = CommandRegistry::new();
        assert!(registry.register(command(1, "dup", "p1", Arc::new(Echo))).await.is_none());
        let warning = registry.register(command(2, "Dup", "p2", Arc::new(Echo))).await;
        assert!(warning.unwrap().contains("replaces"));
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_executor_error_becomes_error_reply() {
        let registry = CommandRegistry::new();
        registry.register(command(1, "fail", "p1", Arc::new(Failing))).await;
        match registry.execute("fail", &CommandContext::default()).await {
            CommandOutcome::Handled(reply) => {
                assert!(reply.is_error);
                assert!(reply.message.unwrap().contains("no dice"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregister_respects_ownership() {
        let registry = CommandRegistry::new();
        registry.register(command(1, "x", "p1", Arc::new(Echo))).await;
        // Replaced by id 2; disposing id 1 must not remove id 2's command.
        registry.register(command(2, "x", "p2", Arc::new(Echo))).await;
        registry.unregister("x", 1).await;
        assert_eq!(registry.list().await.len(), 1);
        registry.unregister("x", 2).await;
        assert!(registry.list().await.is_empty());
    }
}
