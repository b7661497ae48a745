//! Response strategies
//!
//! New topics are explored from three angles in parallel; continuations get a
//! single answer grounded in the thread's recent history. Generation failures
//! never escape this module: they become apology text plus an error marker.

mod direct;
mod exploratory;
pub mod prompts;

use crate::config::GenerationConfig;
use crate::llm::{GenerationParams, LlmProvider, ProviderKind};
use crate::types::{ClassificationResult, Message, QueryType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Exploratory branch identity; `Primary` is the answer that gets stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKey {
    /// Essence framing
    Primary,
    /// Relational framing
    Systems,
    /// Practical framing
    Applied,
}

impl BranchKey {
    pub const ALL: [BranchKey; 3] = [BranchKey::Primary, BranchKey::Systems, BranchKey::Applied];

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKey::Primary => "primary",
            BranchKey::Systems => "systems",
            BranchKey::Applied => "applied",
        }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider, model and accounting for one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub total_duration_ms: u64,
    /// Exploratory only: wall time of the concurrent branch phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_duration_ms: Option<u64>,
    /// Exploratory only: parallel phase over total wall time, 0-1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_efficiency: Option<f64>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One exploratory branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOutcome {
    pub key: BranchKey,
    pub question: String,
    pub response: String,
    pub temperature: f32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    /// Set when `response` is the apology fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BranchOutcome {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploratoryOutcome {
    /// Always three, in `BranchKey::ALL` order
    pub branches: Vec<BranchOutcome>,
    /// Set when the reframing call failed and templated questions were used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reframe_error: Option<String>,
    pub metadata: GenerationMetadata,
}

impl ExploratoryOutcome {
    pub fn branch(&self, key: BranchKey) -> Option<&BranchOutcome> {
        self.branches.iter().find(|b| b.key == key)
    }

    /// Response stored as the thread's answer
    pub fn primary_response(&self) -> &str {
        self.branch(BranchKey::Primary)
            .map(|b| b.response.as_str())
            .unwrap_or(prompts::BRANCH_APOLOGY)
    }

    pub fn responses(&self) -> BTreeMap<BranchKey, String> {
        self.branches
            .iter()
            .map(|b| (b.key, b.response.clone()))
            .collect()
    }

    pub fn questions(&self) -> Vec<String> {
        self.branches.iter().map(|b| b.question.clone()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.branches.iter().any(BranchOutcome::is_degraded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectOutcome {
    pub response: String,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: GenerationMetadata,
}

/// Result of whichever strategy ran
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Exploratory(ExploratoryOutcome),
    Direct(DirectOutcome),
}

impl DispatchOutcome {
    /// The single response persisted for this interaction
    pub fn chosen_response(&self) -> &str {
        match self {
            DispatchOutcome::Exploratory(e) => e.primary_response(),
            DispatchOutcome::Direct(d) => &d.response,
        }
    }

    pub fn is_degraded(&self) -> bool {
        match self {
            DispatchOutcome::Exploratory(e) => e.is_degraded(),
            DispatchOutcome::Direct(d) => d.degraded,
        }
    }

    pub fn metadata(&self) -> &GenerationMetadata {
        match self {
            DispatchOutcome::Exploratory(e) => &e.metadata,
            DispatchOutcome::Direct(d) => &d.metadata,
        }
    }
}

/// Picks and runs the response strategy for a classified query
#[derive(Debug, Clone, Default)]
pub struct ResponseDispatcher {
    config: GenerationConfig,
}

impl ResponseDispatcher {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub async fn dispatch(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        classification: &ClassificationResult,
        context: &[Message],
        params: &GenerationParams,
    ) -> DispatchOutcome {
        match classification.query_type {
            QueryType::NewTopic => {
                DispatchOutcome::Exploratory(self.explore(provider, query, params).await)
            }
            QueryType::FollowUp | QueryType::Clarification | QueryType::RelatedTopic => {
                DispatchOutcome::Direct(
                    self.answer_directly(provider, query, context, params)
                        .await,
                )
            }
        }
    }

    fn deadline(&self) -> tokio::time::Instant {
        tokio::time::Instant::now() + self.config.request_timeout()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::{Result, RouteError};
    use crate::llm::{ChatMessage, Completion, GenerationParams, LlmProvider, ProviderKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies by prompt content: fails on `fail_marker`, stalls on
    /// `stall_marker`, answers reframing prompts with `reframe_reply`
    pub struct ScriptedProvider {
        pub reframe_reply: Option<String>,
        pub fail_marker: Option<String>,
        pub stall_marker: Option<String>,
        pub calls: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self {
                reframe_reply: Some(
                    "1. Why does it work?\n2. How do the parts connect?\n3. Where is it used?"
                        .to_string(),
                ),
                fail_marker: None,
                stall_marker: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn temperatures(&self) -> Vec<f32> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat_complete(
            &self,
            messages: &[ChatMessage],
            params: &GenerationParams,
        ) -> Result<Completion> {
            let prompt = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            self.calls
                .lock()
                .unwrap()
                .push((prompt.clone(), params.temperature));

            if self.fail_marker.as_deref().is_some_and(|m| prompt.contains(m)) {
                return Err(RouteError::Llm("scripted failure".to_string()));
            }
            if self.stall_marker.as_deref().is_some_and(|m| prompt.contains(m)) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            let text = if prompt.contains("exactly three numbered questions") {
                match &self.reframe_reply {
                    Some(reply) => reply.clone(),
                    None => return Err(RouteError::Llm("reframe unavailable".to_string())),
                }
            } else {
                format!("Answer to: {}", prompt.lines().last().unwrap_or_default())
            };

            Ok(Completion {
                text,
                model: "scripted".to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
            })
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Ollama
        }

        fn default_model(&self) -> &str {
            "scripted"
        }
    }
}
