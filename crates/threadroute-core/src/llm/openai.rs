//! HTTP client for OpenAI and OpenAI-compatible services (vLLM, LiteLLM, etc.)

use super::{ApiMetrics, ChatMessage, Completion, GenerationParams, LlmProvider, MetricsSnapshot};
use super::ProviderKind;
use crate::config::OpenAiConfig;
use crate::error::{Result, RouteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// OpenAI-compatible chat client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    config: OpenAiConfig,
    metrics: Arc<ApiMetrics>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
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
        format!(
            "{}/v1/chat/completions",
            self.config.url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion> {
        let started = self.metrics.record_request();
        let model = params.model.as_deref().unwrap_or(&self.config.model);

        let request = ChatRequest {
            model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let mut req = self.http_client.post(self.endpoint()).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            self.metrics.record_error();
            RouteError::Http(e)
        })?;

        if !response.status().is_success() {
            self.metrics.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RouteError::ExternalError(format!(
                "OpenAI service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.metrics.record_error();
            RouteError::Http(e)
        })?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                self.metrics.record_error();
                RouteError::Llm("No response from OpenAI".to_string())
            })?;

        let completion = Completion {
            text,
            model: chat_response.model.unwrap_or_else(|| model.to_string()),
            prompt_tokens: chat_response.usage.as_ref().and_then(|u| u.prompt_tokens),
            completion_tokens: chat_response.usage.as_ref().and_then(|u| u.completion_tokens),
        };
        self.metrics
            .record_success(started, completion.total_tokens());

        tracing::debug!(
            provider = "openai",
            model = %completion.model,
            tokens = ?completion.total_tokens(),
            "Chat completion finished"
        );

        Ok(completion)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}
