//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use threadroute_core::config::{GenerationConfig, MemoryConfig, RoutingConfig};
use threadroute_core::llm::{ApiMetrics, MetricsSnapshot};
use threadroute_core::{
    ChatMessage, Completion, ConversationMemory, GenerationParams, HashEmbedder, LlmProvider,
    ProviderKind, ProviderRegistry, QueryClassifier, RelevanceScorer, ResponseDispatcher,
    Result, RouteError, ThreadOrchestrator, ThreadStore,
};

pub const REFRAME_REPLY: &str = "1. What principles allow machines to learn from data?\n\
2. How do data, models and training components interact in machine learning systems?\n\
3. Where is machine learning applied in industry today?";

pub const ANSWER: &str = "Machine learning lets computers learn patterns from data. \
You can give a model many examples and it generalises to new inputs.";

/// In-process provider: answers every prompt with [`ANSWER`], answers
/// reframing prompts with [`REFRAME_REPLY`], and fails any prompt that
/// contains `fail_marker`.
pub struct ScriptedProvider {
    pub fail_marker: Option<String>,
    pub prompts: Mutex<Vec<String>>,
    pub metrics: ApiMetrics,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            fail_marker: None,
            prompts: Mutex::new(Vec::new()),
            metrics: ApiMetrics::default(),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            prompts: Mutex::new(Vec::new()),
            metrics: ApiMetrics::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<Completion> {
        let prompt = messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt.clone());
        let started = self.metrics.record_request();

        if let Some(marker) = &self.fail_marker {
            if prompt.contains(marker.as_str()) {
                self.metrics.record_error();
                return Err(RouteError::Llm("injected failure".to_string()));
            }
        }

        let text = if prompt.contains("exactly three numbered questions") {
            REFRAME_REPLY.to_string()
        } else {
            ANSWER.to_string()
        };

        self.metrics.record_success(started, Some(24));
        Ok(Completion {
            text,
            model: "scripted-model".to_string(),
            prompt_tokens: Some(8),
            completion_tokens: Some(16),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}

/// Orchestrator over `store` with the hashing embedder and `provider`
pub fn orchestrator(
    store: Arc<dyn ThreadStore>,
    provider: Arc<ScriptedProvider>,
) -> ThreadOrchestrator {
    let scorer = RelevanceScorer::new(Arc::new(HashEmbedder::default()), RoutingConfig::default());
    let memory = Arc::new(ConversationMemory::new(store, MemoryConfig::default()));
    ThreadOrchestrator::new(
        QueryClassifier::new(scorer),
        memory,
        ResponseDispatcher::new(GenerationConfig::default()),
        ProviderRegistry::new().with_provider(provider),
    )
}
