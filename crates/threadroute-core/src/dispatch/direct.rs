//! Single context-grounded generation for continuations

use super::prompts::{contextual_prompt, DIRECT_APOLOGY};
use super::{DirectOutcome, GenerationMetadata, ResponseDispatcher};
use crate::error::RouteError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::types::Message;
use std::time::Instant;
use tokio::time::timeout_at;

impl ResponseDispatcher {
    pub async fn answer_directly(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        context: &[Message],
        params: &GenerationParams,
    ) -> DirectOutcome {
        let started = Instant::now();
        let prompt = contextual_prompt(context, query);

        let result = match timeout_at(self.deadline(), provider.generate(&prompt, params)).await {
            Ok(r) => r,
            Err(_) => Err(RouteError::Timeout(self.config.request_timeout().as_millis() as u64)),
        };
        let total_duration_ms = started.elapsed().as_millis() as u64;

        let mut metadata = GenerationMetadata {
            provider: provider.kind(),
            model: params.resolve_model(provider).to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            total_duration_ms,
            parallel_duration_ms: None,
            parallel_efficiency: None,
            prompt_tokens: 0,
            completion_tokens: 0,
        };

        match result {
            Ok(completion) => {
                metadata.prompt_tokens = completion.prompt_tokens.unwrap_or(0) as u64;
                metadata.completion_tokens = completion.completion_tokens.unwrap_or(0) as u64;
                tracing::info!(
                    context_messages = context.len(),
                    duration_ms = total_duration_ms,
                    "Contextual response generated"
                );
                DirectOutcome {
                    response: completion.text,
                    degraded: false,
                    error: None,
                    metadata,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, duration_ms = total_duration_ms, "Contextual response failed");
                DirectOutcome {
                    response: DIRECT_APOLOGY.to_string(),
                    degraded: true,
                    error: Some(e.to_string()),
                    metadata,
                }
            }
        }
    }
}
