//! Three-way exploratory generation for new topics

use super::prompts::{fallback_questions, parse_reframed_questions, reframe_prompt, BRANCH_APOLOGY};
use super::{BranchKey, BranchOutcome, ExploratoryOutcome, GenerationMetadata, ResponseDispatcher};
use crate::error::RouteError;
use crate::llm::{GenerationParams, LlmProvider};
use futures::future::join_all;
use std::time::Instant;
use tokio::time::timeout_at;

impl ResponseDispatcher {
    /// Reframe the query into three questions, then answer all three
    /// concurrently. A failed or late branch carries the apology text; the
    /// others are unaffected.
    pub async fn explore(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        params: &GenerationParams,
    ) -> ExploratoryOutcome {
        let started = Instant::now();
        let deadline = self.deadline();

        let (questions, reframe_error, reframe_tokens) =
            self.reframe(provider, query, params, deadline).await;

        tracing::info!(branches = questions.len(), "Generating exploratory responses in parallel");
        let parallel_started = Instant::now();
        let branches = join_all(BranchKey::ALL.into_iter().zip(questions).enumerate().map(
            |(i, (key, question))| {
                let branch_params = params.perturbed(self.config.temperature_step * i as f32);
                self.run_branch(provider, key, question, branch_params, deadline)
            },
        ))
        .await;
        let parallel = parallel_started.elapsed();
        let total = started.elapsed();

        let parallel_efficiency = if total.as_secs_f64() > 0.0 {
            (parallel.as_secs_f64() / total.as_secs_f64()).min(1.0)
        } else {
            1.0
        };

        let (mut prompt_tokens, mut completion_tokens) = reframe_tokens;
        for b in &branches {
            prompt_tokens += b.prompt_tokens.unwrap_or(0) as u64;
            completion_tokens += b.completion_tokens.unwrap_or(0) as u64;
        }

        let failed = branches.iter().filter(|b| b.is_degraded()).count();
        tracing::info!(
            total_duration_ms = total.as_millis() as u64,
            parallel_duration_ms = parallel.as_millis() as u64,
            parallel_efficiency,
            failed_branches = failed,
            "Exploratory responses generated"
        );

        ExploratoryOutcome {
            branches,
            reframe_error,
            metadata: GenerationMetadata {
                provider: provider.kind(),
                model: params.resolve_model(provider).to_string(),
                temperature: params.temperature,
                max_tokens: params.max_tokens,
                total_duration_ms: total.as_millis() as u64,
                parallel_duration_ms: Some(parallel.as_millis() as u64),
                parallel_efficiency: Some(parallel_efficiency),
                prompt_tokens,
                completion_tokens,
            },
        }
    }

    /// Questions for the three branches; templated ones if the call fails
    async fn reframe(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        params: &GenerationParams,
        deadline: tokio::time::Instant,
    ) -> (Vec<String>, Option<String>, (u64, u64)) {
        let mut reframe_params = params.perturbed(self.config.temperature_step);
        reframe_params.max_tokens = self.config.reframe_max_tokens;

        let prompt = reframe_prompt(query);
        let result = match timeout_at(deadline, provider.generate(&prompt, &reframe_params)).await {
            Ok(r) => r,
            Err(_) => Err(RouteError::Timeout(self.config.request_timeout().as_millis() as u64)),
        };

        match result {
            Ok(completion) => {
                let questions = parse_reframed_questions(&completion.text);
                tracing::debug!(?questions, "Query reframed");
                let tokens = (
                    completion.prompt_tokens.unwrap_or(0) as u64,
                    completion.completion_tokens.unwrap_or(0) as u64,
                );
                (questions, None, tokens)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reframing failed, using templated questions");
                (fallback_questions(query), Some(e.to_string()), (0, 0))
            }
        }
    }

    async fn run_branch(
        &self,
        provider: &dyn LlmProvider,
        key: BranchKey,
        question: String,
        params: GenerationParams,
        deadline: tokio::time::Instant,
    ) -> BranchOutcome {
        let started = Instant::now();
        let result = match timeout_at(deadline, provider.generate(&question, &params)).await {
            Ok(r) => r,
            Err(_) => Err(RouteError::Timeout(self.config.request_timeout().as_millis() as u64)),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(completion) => BranchOutcome {
                key,
                question,
                response: completion.text,
                temperature: params.temperature,
                duration_ms,
                prompt_tokens: completion.prompt_tokens,
                completion_tokens: completion.completion_tokens,
                error: None,
            },
            Err(e) => {
                tracing::warn!(branch = %key, error = %e, "Exploratory branch failed");
                BranchOutcome {
                    key,
                    question,
                    response: BRANCH_APOLOGY.to_string(),
                    temperature: params.temperature,
                    duration_ms,
                    prompt_tokens: None,
                    completion_tokens: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
