//! Thread orchestration: classify, gather context, generate, remember

use crate::config::{Config, GenerationConfig};
use crate::dispatch::{BranchKey, DispatchOutcome, GenerationMetadata, ResponseDispatcher};
use crate::error::{Result, RouteError};
use crate::llm::{
    embedder_from_config, GenerationParams, MetricsSnapshot, ProviderKind, ProviderRegistry,
};
use crate::memory::{context_turns, ConversationMemory, ThreadStore, ThreadSummary};
use crate::routing::{QueryClassifier, RelevanceScorer};
use crate::types::{Message, QueryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Inbound call: one user query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Existing thread to continue; a new one is minted when absent
    #[serde(default)]
    pub thread_id: Option<String>,
    pub user_id: String,
    /// Provider tag, any casing (`ollama`, `OpenAI`, `LLMProvider.OPENAI`, ...)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// 0-2; the configured default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_provider() -> String {
    ProviderKind::Ollama.to_string()
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            thread_id: None,
            user_id: user_id.into(),
            provider: default_provider(),
            model: None,
            temperature: None,
            max_tokens: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }
}

/// Response body, tagged by the strategy that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResponsePayload {
    Exploratory {
        responses: BTreeMap<BranchKey, String>,
        questions: Vec<String>,
    },
    Direct {
        response: String,
    },
}

impl ResponsePayload {
    /// The answer stored in thread history
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            ResponsePayload::Exploratory { responses, .. } => {
                responses.get(&BranchKey::Primary).map(String::as_str)
            }
            ResponsePayload::Direct { response } => Some(response),
        }
    }
}

/// Caller-facing outcome of [`ThreadOrchestrator::process_query`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub thread_id: String,
    pub query: String,
    pub query_type: QueryType,
    pub was_continuation: bool,
    /// Conversation turns fed to generation
    pub context_messages_used: usize,
    pub classification_confidence: f64,
    pub classification_reasoning: String,
    pub processing_time_ms: u64,
    pub response: ResponsePayload,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub degraded: bool,
    pub generation: GenerationMetadata,
    /// Running request counters of the provider that answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metrics: Option<MetricsSnapshot>,
}

/// Top-level entry point for the routing engine
pub struct ThreadOrchestrator {
    classifier: QueryClassifier,
    memory: Arc<ConversationMemory>,
    dispatcher: ResponseDispatcher,
    providers: ProviderRegistry,
}

impl ThreadOrchestrator {
    pub fn new(
        classifier: QueryClassifier,
        memory: Arc<ConversationMemory>,
        dispatcher: ResponseDispatcher,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            classifier,
            memory,
            dispatcher,
            providers,
        }
    }

    /// Wire every component from configuration over the given store
    pub fn from_config(config: &Config, store: Arc<dyn ThreadStore>) -> Result<Self> {
        let embedder = embedder_from_config(&config.embedding)?;
        let scorer = RelevanceScorer::new(embedder, config.routing.clone());
        let memory = Arc::new(ConversationMemory::new(store, config.memory.clone()));
        Ok(Self::new(
            QueryClassifier::new(scorer),
            memory,
            ResponseDispatcher::new(config.generation.clone()),
            ProviderRegistry::from_config(config)?,
        ))
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    fn generation(&self) -> &GenerationConfig {
        self.dispatcher.config()
    }

    fn validate(&self, request: &QueryRequest) -> Result<GenerationParams> {
        if request.query.trim().is_empty() {
            return Err(RouteError::InvalidInput("query must not be empty".to_string()));
        }
        let temperature = request
            .temperature
            .unwrap_or(self.generation().default_temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RouteError::InvalidInput(format!(
                "temperature must be within 0-2, got {}",
                temperature
            )));
        }
        let max_tokens = request
            .max_tokens
            .unwrap_or(self.generation().default_max_tokens);
        if max_tokens == 0 {
            return Err(RouteError::InvalidInput(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(GenerationParams::new(temperature, max_tokens).with_model(request.model.clone()))
    }

    /// Route one query through classification, generation and memory.
    ///
    /// Only invalid input, provider configuration and persistence failures
    /// are returned as errors; generation problems come back as apology text
    /// with `degraded` set.
    pub async fn process_query(&self, request: QueryRequest) -> Result<RoutingResult> {
        let started = Instant::now();

        let params = self.validate(&request)?;
        let kind: ProviderKind = request.provider.parse()?;
        let provider = self.providers.resolve(kind)?;

        let supplied_thread = request
            .thread_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let thread_id = supplied_thread
            .map(str::to_string)
            .unwrap_or_else(ConversationMemory::new_thread_id);

        tracing::info!(
            thread_id = %thread_id,
            provider = %kind,
            new_thread = supplied_thread.is_none(),
            "Processing query"
        );

        let history = self
            .memory
            .get_history(&thread_id, self.memory.config().history_limit)
            .await?;

        let classification = self
            .classifier
            .classify(&request.query, &history, supplied_thread)
            .await;

        let context: Vec<Message> = if classification.should_use_context {
            self.memory
                .get_context_for_query(&thread_id, classification.query_type)
                .await?
        } else {
            Vec::new()
        };
        let context_used = context_turns(&context);

        let outcome = self
            .dispatcher
            .dispatch(
                provider.as_ref(),
                &request.query,
                &classification,
                &context,
                &params,
            )
            .await;
        let degraded = outcome.is_degraded();

        let mut metadata = request.metadata.clone();
        metadata.insert("user_id".to_string(), json!(request.user_id));
        metadata.insert("provider".to_string(), json!(kind));
        metadata.insert("model".to_string(), json!(outcome.metadata().model));
        metadata.insert(
            "classification_confidence".to_string(),
            json!(classification.confidence),
        );
        metadata.insert(
            "classification_reasoning".to_string(),
            json!(classification.reasoning),
        );
        metadata.insert("degraded".to_string(), json!(degraded));

        let message = self
            .memory
            .add_interaction(
                &thread_id,
                &request.query,
                outcome.chosen_response(),
                classification.query_type,
                context_used,
                metadata,
            )
            .await?;

        let generation = outcome.metadata().clone();
        let response = match outcome {
            DispatchOutcome::Exploratory(e) => ResponsePayload::Exploratory {
                responses: e.responses(),
                questions: e.questions(),
            },
            DispatchOutcome::Direct(d) => ResponsePayload::Direct {
                response: d.response,
            },
        };

        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            thread_id = %thread_id,
            query_type = %classification.query_type,
            context_used,
            degraded,
            duration_ms = processing_time_ms,
            "Query processed"
        );

        Ok(RoutingResult {
            thread_id,
            query: request.query,
            query_type: classification.query_type,
            was_continuation: classification.query_type.is_continuation(),
            context_messages_used: context_used,
            classification_confidence: classification.confidence,
            classification_reasoning: classification.reasoning,
            processing_time_ms,
            response,
            message_id: message.message_id,
            timestamp: message.timestamp,
            degraded,
            generation,
            provider_metrics: provider.metrics(),
        })
    }

    pub async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<Message>> {
        self.memory.get_history(thread_id, limit).await
    }

    pub async fn thread_summary(&self, thread_id: &str) -> Result<Option<ThreadSummary>> {
        self.memory.thread_summary(thread_id).await
    }

    pub async fn thread_exists(&self, thread_id: &str) -> Result<bool> {
        self.memory.thread_exists(thread_id).await
    }

    /// Retention sweep; the configured age when `max_age_days` is `None`
    pub async fn cleanup_old_threads(&self, max_age_days: Option<i64>) -> Result<usize> {
        self.memory.sweep_expired(max_age_days).await
    }
}
