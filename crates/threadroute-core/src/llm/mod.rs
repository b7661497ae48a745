//! LLM and embedding provider adapters

mod hash_embedder;
mod http_embedder;
mod metrics;
mod ollama;
mod openai;
mod provider;
mod traits;

pub use hash_embedder::HashEmbedder;
pub use http_embedder::HttpEmbedder;
pub use metrics::{ApiMetrics, MetricsSnapshot};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use provider::{ProviderKind, ProviderRegistry};
pub use traits::{ChatMessage, Completion, Embedder, GenerationParams, LlmProvider};

use crate::config::EmbeddingConfig;
use crate::error::Result;
use std::sync::Arc;

/// HTTP embedder when a service url is configured, local hashing otherwise
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if config.url.is_some() {
        tracing::info!(model = %config.model, "Using HTTP embedding service");
        Ok(Arc::new(HttpEmbedder::from_config(config.clone())?))
    } else {
        tracing::debug!("No embedding url configured, using local hashing embedder");
        Ok(Arc::new(HashEmbedder::new(config.dimensions)))
    }
}
