//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Classification and relevance thresholds
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Thread memory and retention
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Generation defaults
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Configuration for every supported LLM provider
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Local Ollama server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Model used when a request does not name one
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_timeout(),
        }
    }
}

/// OpenAI or any OpenAI-compatible endpoint (vLLM, LiteLLM, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL, without the `/v1` suffix
    #[serde(default = "default_openai_url")]
    pub url: String,

    /// Model used when a request does not name one
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key; the provider counts as unconfigured without one
    #[serde(default = "default_openai_api_key")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            url: default_openai_url(),
            model: default_openai_model(),
            api_key: default_openai_api_key(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings service. When unset the
    /// local hashing embedder is used.
    #[serde(default = "default_embedding_url")]
    pub url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding dimensions
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            api_key: None,
            dimensions: default_embedding_dimensions(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Thresholds and weights used by the relevance scorer and classifier.
///
/// All scores live on a 0-1 scale. `score_scale` only stretches the value
/// reported in `RelevanceResult::score`; the continuation threshold is
/// compared against the scaled value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub similarity_threshold: f64,
    pub continuation_threshold: f64,
    pub semantic_weight: f64,
    pub lexical_weight: f64,
    pub score_scale: f64,
    pub clarification_threshold: f64,
    pub new_topic_threshold: f64,
    /// Separates follow-ups from related topics. Compared against the
    /// blended relevance score (semantic and lexical over score_scale), not the raw
    /// cosine, so it holds when the embedder is unavailable.
    pub follow_up_semantic_floor: f64,
    pub linguistic_weight: f64,
    /// Number of recent exchanges compared against the query
    pub recent_exchanges: usize,
    pub classification_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.25,
            continuation_threshold: 0.4,
            semantic_weight: 0.7,
            lexical_weight: 0.3,
            score_scale: 1.0,
            clarification_threshold: 0.3,
            new_topic_threshold: 0.4,
            follow_up_semantic_floor: 0.4,
            linguistic_weight: 0.6,
            recent_exchanges: 3,
            classification_timeout_ms: 10_000,
        }
    }
}

impl RoutingConfig {
    pub fn classification_timeout(&self) -> Duration {
        Duration::from_millis(self.classification_timeout_ms)
    }
}

/// Conversation memory, cache sizing and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of threads kept in the in-process cache
    pub cache_max_threads: usize,
    /// Cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Messages loaded for classification
    pub history_limit: usize,
    /// Messages loaded when building a context window
    pub context_load_limit: usize,
    /// Context window sizes, in turns (one user or assistant utterance)
    pub clarification_context_turns: usize,
    pub related_context_turns: usize,
    pub follow_up_context_turns: usize,
    /// Threads older than this are removed by the retention sweep
    pub retention_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_max_threads: 100,
            cache_ttl_secs: 30 * 60,
            history_limit: 10,
            context_load_limit: 20,
            clarification_context_turns: 2,
            related_context_turns: 4,
            follow_up_context_turns: 6,
            retention_days: 30,
        }
    }
}

impl MemoryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Generation defaults shared by both response strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub reframe_max_tokens: u32,
    /// Temperature added per exploratory branch
    pub temperature_step: f32,
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_temperature: 0.7,
            default_max_tokens: 1500,
            reframe_max_tokens: 800,
            temperature_step: 0.1,
            request_timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_ollama_url() -> String {
    std::env::var("THREADROUTE_OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

fn default_ollama_model() -> String {
    std::env::var("THREADROUTE_OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1:8b".to_string())
}

fn default_openai_url() -> String {
    std::env::var("THREADROUTE_OPENAI_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

fn default_openai_model() -> String {
    std::env::var("THREADROUTE_OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_openai_api_key() -> Option<String> {
    std::env::var("THREADROUTE_OPENAI_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
}

fn default_embedding_url() -> Option<String> {
    std::env::var("THREADROUTE_EMBEDDING_URL").ok()
}

fn default_embedding_model() -> String {
    std::env::var("THREADROUTE_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_embedding_dimensions() -> usize {
    std::env::var("THREADROUTE_EMBEDDING_DIMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(384)
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load config from `THREADROUTE_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("THREADROUTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        Self::load_from(path)
    }

    /// Load config from an explicit path; a missing file yields defaults
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject settings that would make the routing decisions meaningless
    pub fn validate(&self) -> Result<()> {
        let r = &self.routing;
        if r.score_scale <= 0.0 || !r.score_scale.is_finite() {
            return Err(crate::RouteError::Config(format!(
                "routing.score_scale must be positive, got {}",
                r.score_scale
            )));
        }
        if r.semantic_weight < 0.0 || r.lexical_weight < 0.0 {
            return Err(crate::RouteError::Config(
                "routing weights must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&r.linguistic_weight) {
            return Err(crate::RouteError::Config(format!(
                "routing.linguistic_weight must be within 0-1, got {}",
                r.linguistic_weight
            )));
        }
        if self.memory.retention_days < 0 {
            return Err(crate::RouteError::Config(format!(
                "memory.retention_days must not be negative, got {}",
                self.memory.retention_days
            )));
        }
        if self.memory.cache_max_threads == 0 {
            return Err(crate::RouteError::Config(
                "memory.cache_max_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
