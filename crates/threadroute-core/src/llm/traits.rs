//! LLM trait definitions

use super::{MetricsSnapshot, ProviderKind};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Text generation backend (Ollama, OpenAI, ...)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete an ordered chat transcript
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion>;

    /// Complete a single prompt, sent as one user message
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Completion> {
        self.chat_complete(&[ChatMessage::user(prompt)], params)
            .await
    }

    fn kind(&self) -> ProviderKind;

    /// Model used when `GenerationParams::model` is unset
    fn default_model(&self) -> &str;

    /// Request counters, if the provider keeps any
    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the provider's default model for this call only
    pub model: Option<String>,
}

impl GenerationParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Copy with a shifted temperature, clamped to the 0-2 range providers accept
    pub fn perturbed(&self, delta: f32) -> Self {
        Self {
            temperature: (self.temperature + delta).clamp(0.0, 2.0),
            ..self.clone()
        }
    }

    /// Model to report for this call
    pub fn resolve_model<'a>(&'a self, provider: &'a dyn LlmProvider) -> &'a str {
        self.model.as_deref().unwrap_or_else(|| provider.default_model())
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::new(0.7, 1500)
    }
}

/// Text returned by a provider plus token accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

impl Completion {
    pub fn total_tokens(&self) -> Option<u32> {
        match (self.prompt_tokens, self.completion_tokens) {
            (None, None) => None,
            (p, c) => Some(p.unwrap_or(0) + c.unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perturbed_clamps() {
        let params = GenerationParams::new(1.95, 100);
        assert_eq!(params.perturbed(0.2).temperature, 2.0);
        assert_eq!(GenerationParams::new(0.0, 10).perturbed(-0.5).temperature, 0.0);
        assert_eq!(params.perturbed(0.0).max_tokens, 100);
    }

    #[test]
    fn test_total_tokens() {
        let mut c = Completion::default();
        assert_eq!(c.total_tokens(), None);
        c.prompt_tokens = Some(12);
        assert_eq!(c.total_tokens(), Some(12));
        c.completion_tokens = Some(30);
        assert_eq!(c.total_tokens(), Some(42));
    }
}
