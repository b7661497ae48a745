//! Client for a local Ollama server

use super::{ApiMetrics, ChatMessage, Completion, GenerationParams, LlmProvider, MetricsSnapshot};
use super::ProviderKind;
use crate::config::OllamaConfig;
use crate::error::{Result, RouteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Ollama `/api/chat` client
pub struct OllamaClient {
    http_client: reqwest::Client,
    config: OllamaConfig,
    metrics: Arc<ApiMetrics>,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    message: Option<ChatMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            metrics: Arc::new(ApiMetrics::default()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion> {
        let started = self.metrics.record_request();
        let model = params.model.as_deref().unwrap_or(&self.config.model);

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_error();
                RouteError::Http(e)
            })?;

        if !response.status().is_success() {
            self.metrics.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RouteError::ExternalError(format!(
                "Ollama error (HTTP {}): {}",
                status, body
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| {
            self.metrics.record_error();
            RouteError::Http(e)
        })?;

        let text = body
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                self.metrics.record_error();
                RouteError::Llm("Empty response from Ollama".to_string())
            })?;

        let completion = Completion {
            text,
            model: body.model.unwrap_or_else(|| model.to_string()),
            prompt_tokens: body.prompt_eval_count,
            completion_tokens: body.eval_count,
        };
        self.metrics
            .record_success(started, completion.total_tokens());

        tracing::debug!(
            provider = "ollama",
            model = %completion.model,
            tokens = ?completion.total_tokens(),
            "Chat completion finished"
        );

        Ok(completion)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}
