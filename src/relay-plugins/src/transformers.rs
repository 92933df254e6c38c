//! Prompt transformer chain.
//!
//! Transformers run strictly in ascending order, each seeing the prompt as
//! mutated by its predecessors. A transformer may pass, replace the prompt,
//! or cancel the send entirely. A failing transformer is logged and treated
//! as a pass; it never aborts the chain.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Context for a transformer invocation.
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    /// Current session ID.
    pub session_id: Option<String>,

    /// Workspace directory.
    pub workspace_directory: PathBuf,

    /// Owning agent, when known.
    pub agent_id: Option<String>,

    /// The raw user message before pipeline assembly.
    pub raw_message: String,
}

/// What a single transformer decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformDecision {
    /// Leave the prompt as-is.
    Pass,

    /// Replace the running prompt.
    Replace(String),

    /// Stop the chain and block the send.
    Cancel { message: Option<String> },
}

/// Result of running the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The chain finished; `transformed` is set iff some transformer changed
    /// the prompt.
    Completed { prompt: String, transformed: bool },

    /// A transformer cancelled the send.
    Blocked { message: Option<String> },
}

/// A registered prompt transformer callback.
#[async_trait]
pub trait PromptTransformer: Send + Sync {
    async fn transform(
        &self,
        ctx: &TransformContext,
        prompt: &str,
    ) -> anyhow::Result<TransformDecision>;
}

#[derive(Clone)]
pub(crate) struct RegisteredTransformer {
    pub id: u64,
    pub plugin_id: String,
    pub order: i32,
    pub seq: u64,
    pub transformer: Arc<dyn PromptTransformer>,
}

/// Order-sorted list of prompt transformers.
pub struct TransformerRegistry {
    transformers: RwLock<Vec<RegisteredTransformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self {
            transformers: RwLock::new(Vec::new()),
        }
    }

    pub(crate) async fn register(&self, entry: RegisteredTransformer) {
        let mut transformers = self.transformers.write().await;
        transformers.push(entry);
        transformers.sort_by_key(|t| (t.order, t.seq));
    }

    pub(crate) async fn unregister(&self, id: u64) {
        let mut transformers = self.transformers.write().await;
        transformers.retain(|t| t.id != id);
    }

    /// Number of registered transformers.
    pub async fn count(&self) -> usize {
        self.transformers.read().await.len()
    }

    /// Run the chain over `prompt`.
    pub async fn apply(&self, ctx: &TransformContext, prompt: &str) -> TransformOutcome {
        let chain: Vec<RegisteredTransformer> = self.transformers.read().await.clone();
        let mut current = prompt.to_string();
        let mut transformed = false;

        for entry in chain {
            match entry.transformer.transform(ctx, &current).await {
                Ok(TransformDecision::Pass) => {}
                Ok(TransformDecision::Replace(next)) => {
                    if next != current {
                        transformed = true;
                        current = next;
                    }
                }
                Ok(TransformDecision::Cancel { message }) => {
                    tracing::debug!(plugin_id = %entry.plugin_id, "prompt blocked by transformer");
                    return TransformOutcome::Blocked { message };
                }
                Err(e) => {
                    tracing::warn!(
                        plugin_id = %entry.plugin_id,
                        error = %e,
                        "prompt transformer failed, skipping"
                    );
                }
            }
        }

        TransformOutcome::Completed {
            prompt: current,
            transformed,
        }
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Transformer that always passes; shared by sibling module tests.
    pub(crate) struct PassThrough;

    #[async_trait]
    impl PromptTransformer for PassThrough {
        async fn transform(
            &self,
            _ctx: &TransformContext,
            _prompt: &str,
        ) -> anyhow::Result<TransformDecision> {
            Ok(TransformDecision::Pass)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(TransformDecision);

    #[async_trait]
    impl PromptTransformer for Fixed {
        async fn transform(
            &self,
            _ctx: &TransformContext,
            _prompt: &str,
        ) -> anyhow::Result<TransformDecision> {
            Ok(self.0.clone())
        }
    }

    struct Suffix(&'static str);

    #[async_trait]
    impl PromptTransformer for Suffix {
        async fn transform(
            &self,
            _ctx: &TransformContext,
            prompt: &str,
        ) -> anyhow::Result<TransformDecision> {
            Ok(TransformDecision::Replace(format!("{prompt}{}", self.0)))
        }
    }

    struct Failing;

    #[async_trait]
    impl PromptTransformer for Failing {
        async fn transform(
            &self,
            _ctx: &TransformContext,
            _prompt: &str,
        ) -> anyhow::Result<TransformDecision> {
            anyhow::bail!("broken transformer")
        }
    }

    fn entry(id: u64, order: i32, transformer: Arc<dyn PromptTransformer>) -> RegisteredTransformer {
        RegisteredTransformer {
            id,
            plugin_id: format!("p{id}"),
            order,
            seq: id,
            transformer,
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let registry = TransformerRegistry::new();
        registry.register(entry(2, 10, Arc::new(Suffix(" world")))).await;
        registry.register(entry(1, 0, Arc::new(Suffix(" hello")))).await;

        match registry.apply(&TransformContext::default(), "say:").await {
            TransformOutcome::Completed { prompt, transformed } => {
                assert_eq!(prompt, "say: hello world");
                assert!(transformed);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identical_replace_does_not_set_transformed() {
        let registry = TransformerRegistry::new();
        registry
            .register(entry(1, 0, Arc::new(Fixed(TransformDecision::Replace("same".into())))))
            .await;
        match registry.apply(&TransformContext::default(), "same").await {
            TransformOutcome::Completed { prompt, transformed } => {
                assert_eq!(prompt, "same");
                assert!(!transformed);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_short_circuits() {
        let registry = TransformerRegistry::new();
        registry
            .register(entry(
                1,
                0,
                Arc::new(Fixed(TransformDecision::Cancel {
                    message: Some("blocked by policy".into()),
                })),
            ))
            .await;
        registry.register(entry(2, 1, Arc::new(Suffix(" unreachable")))).await;

        assert_eq!(
            registry.apply(&TransformContext::default(), "hi").await,
            TransformOutcome::Blocked {
                message: Some("blocked by policy".into())
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_skipped() {
        let registry = TransformerRegistry::new();
        registry.register(entry(1, 0, Arc::new(Failing))).await;
        registry.register(entry(2, 1, Arc::new(Suffix("!")))).await;

        match registry.apply(&TransformContext::default(), "ok").await {
            TransformOutcome::Completed { prompt, .. } => assert_eq!(prompt, "ok!"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = TransformerRegistry::new();
        registry.register(entry(1, 0, Arc::new(Suffix("!")))).await;
        registry.unregister(1).await;
        assert_eq!(registry.count().await, 0);
    }
}
