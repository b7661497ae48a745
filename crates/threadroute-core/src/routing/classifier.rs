//! Query classification: which strategy answers the next query

use super::patterns::{
    pattern_score, CLARIFICATION_PATTERNS, FOLLOW_UP_PATTERNS, NEW_TOPIC_PATTERNS,
};
use super::RelevanceScorer;
use crate::config::RoutingConfig;
use crate::error::{Result, RouteError};
use crate::types::{ClassificationResult, Message, QueryType};
use std::time::Instant;

const CLARIFICATION_CONTEXT_WEIGHT: f64 = 0.9;
const FOLLOW_UP_CONTEXT_WEIGHT: f64 = 0.8;
const RELATED_CONTEXT_WEIGHT: f64 = 0.6;
const DEFAULT_CONTEXT_WEIGHT: f64 = 0.5;
const DEFAULT_CONFIDENCE: f64 = 0.3;
const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Scores feeding the decision table, kept for logging
#[derive(Debug, Clone, Copy)]
struct Signals {
    follow_up: f64,
    semantic: f64,
    new_topic: f64,
    combined: f64,
}

/// Assigns a [`QueryType`] from lexical cues and relevance to recent history
#[derive(Clone)]
pub struct QueryClassifier {
    scorer: RelevanceScorer,
}

impl QueryClassifier {
    pub fn new(scorer: RelevanceScorer) -> Self {
        Self { scorer }
    }

    fn config(&self) -> &RoutingConfig {
        self.scorer.config()
    }

    /// Never fails: internal errors and timeouts yield a low-confidence
    /// NEW_TOPIC result carrying the error text.
    pub async fn classify(
        &self,
        query: &str,
        history: &[Message],
        thread_id: Option<&str>,
    ) -> ClassificationResult {
        let start = Instant::now();
        let timeout = self.config().classification_timeout();

        let outcome = match tokio::time::timeout(timeout, self.try_classify(query, history, thread_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RouteError::Timeout(timeout.as_millis() as u64)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                tracing::info!(
                    query_type = %result.query_type,
                    confidence = result.confidence,
                    should_use_context = result.should_use_context,
                    duration_ms,
                    "Query classified"
                );
                result
            }
            Err(e) => {
                tracing::error!(error = %e, duration_ms, "Query classification failed");
                ClassificationResult::new_topic(
                    FALLBACK_CONFIDENCE,
                    format!("Classification error: {} - defaulting to new topic", e),
                )
            }
        }
    }

    async fn try_classify(
        &self,
        query: &str,
        history: &[Message],
        thread_id: Option<&str>,
    ) -> Result<ClassificationResult> {
        if history.is_empty() || thread_id.map_or(true, |t| t.trim().is_empty()) {
            return Ok(ClassificationResult::new_topic(
                1.0,
                "no conversation history",
            ));
        }

        let config = self.config();

        let clarification = pattern_score(query, &CLARIFICATION_PATTERNS);
        if clarification > config.clarification_threshold {
            return Ok(ClassificationResult {
                query_type: QueryType::Clarification,
                confidence: clarification,
                reasoning: format!("Clarification request detected (score: {:.3})", clarification),
                should_use_context: true,
                context_weight: CLARIFICATION_CONTEXT_WEIGHT,
            });
        }

        let follow_up = pattern_score(query, &FOLLOW_UP_PATTERNS);
        let semantic = self.semantic_score(query, history).await?;
        let new_topic = pattern_score(query, &NEW_TOPIC_PATTERNS);
        let combined =
            follow_up * config.linguistic_weight + semantic * (1.0 - config.linguistic_weight);

        let signals = Signals {
            follow_up,
            semantic,
            new_topic,
            combined,
        };
        tracing::debug!(?signals, "Classification scores");

        Ok(self.decide(signals))
    }

    fn decide(&self, s: Signals) -> ClassificationResult {
        let config = self.config();

        if s.combined > config.similarity_threshold {
            let confidence = s.combined.min(1.0);
            if s.semantic > config.follow_up_semantic_floor {
                ClassificationResult {
                    query_type: QueryType::FollowUp,
                    confidence,
                    reasoning: format!(
                        "Follow-up detected (linguistic: {:.3}, semantic: {:.3})",
                        s.follow_up, s.semantic
                    ),
                    should_use_context: true,
                    context_weight: FOLLOW_UP_CONTEXT_WEIGHT,
                }
            } else {
                ClassificationResult {
                    query_type: QueryType::RelatedTopic,
                    confidence,
                    reasoning: format!(
                        "Related topic detected (linguistic: {:.3}, lower semantic similarity: {:.3})",
                        s.follow_up, s.semantic
                    ),
                    should_use_context: true,
                    context_weight: RELATED_CONTEXT_WEIGHT,
                }
            }
        } else if s.new_topic > config.new_topic_threshold {
            ClassificationResult::new_topic(
                s.new_topic,
                format!("New topic detected (new topic indicators: {:.3})", s.new_topic),
            )
        } else {
            ClassificationResult {
                query_type: QueryType::FollowUp,
                confidence: DEFAULT_CONFIDENCE,
                reasoning: "Default to follow-up (ambiguous query with conversation history)"
                    .to_string(),
                should_use_context: true,
                context_weight: DEFAULT_CONTEXT_WEIGHT,
            }
        }
    }

    /// Relevance of the query to the last few exchanges, normalised to 0-1
    async fn semantic_score(&self, query: &str, history: &[Message]) -> Result<f64> {
        let config = self.config();
        let recent = &history[history.len().saturating_sub(config.recent_exchanges)..];
        let context = recent
            .iter()
            .flat_map(|m| [m.user_query.as_str(), m.ai_response.as_str()])
            .collect::<Vec<_>>()
            .join(" ");

        let relevance = self.scorer.score(query, &context).await;
        let normalised = relevance.score / config.score_scale;
        if !normalised.is_finite() {
            return Err(RouteError::Other(anyhow::anyhow!(
                "relevance score is not finite ({})",
                relevance.score
            )));
        }
        Ok(normalised.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Embedder, HashEmbedder};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn message(query: &str, response: &str) -> Message {
        Message {
            message_id: "m".to_string(),
            thread_id: "t".to_string(),
            user_query: query.to_string(),
            ai_response: response.to_string(),
            timestamp: Utc::now(),
            query_type: QueryType::NewTopic,
            context_used: 0,
            metadata: HashMap::new(),
        }
    }

    fn classifier() -> QueryClassifier {
        QueryClassifier::new(RelevanceScorer::new(
            Arc::new(HashEmbedder::default()),
            RoutingConfig::default(),
        ))
    }

    fn cooking_history() -> Vec<Message> {
        vec![message(
            "How long should I knead bread dough?",
            "Knead bread dough for roughly ten minutes until smooth and elastic.",
        )]
    }

    #[tokio::test]
    async fn test_no_history_is_new_topic() {
        let c = classifier();
        let result = c.classify("Can you give me examples?", &[], Some("t")).await;
        assert_eq!(result.query_type, QueryType::NewTopic);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.should_use_context);

        let result = c.classify("tell me more", &cooking_history(), None).await;
        assert_eq!(result.query_type, QueryType::NewTopic);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_clarification() {
        let result = classifier()
            .classify("I don't understand", &cooking_history(), Some("t"))
            .await;
        assert_eq!(result.query_type, QueryType::Clarification);
        assert_eq!(result.context_weight, 0.9);
        assert!(result.should_use_context);
    }

    #[tokio::test]
    async fn test_ambiguous_defaults_to_follow_up() {
        let result = classifier()
            .classify("Quantum entanglement", &cooking_history(), Some("t"))
            .await;
        assert_eq!(result.query_type, QueryType::FollowUp);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.context_weight, 0.5);
    }

    #[tokio::test]
    async fn test_new_topic_indicators_with_history() {
        let result = classifier()
            .classify(
                "What is the difference between TCP and UDP, and what are the advantages of each?",
                &cooking_history(),
                Some("t"),
            )
            .await;
        assert_eq!(result.query_type, QueryType::NewTopic);
        assert!(result.confidence > 0.4);
    }

    #[tokio::test]
    async fn test_follow_up_with_overlap() {
        let history = vec![message(
            "What is bread dough made of?",
            "Bread dough is made of flour, water, salt and yeast.",
        )];
        let result = classifier()
            .classify("Could you also explain the yeast in bread dough?", &history, Some("t"))
            .await;
        assert!(matches!(
            result.query_type,
            QueryType::FollowUp | QueryType::RelatedTopic
        ));
        assert!(result.confidence > 0.25);
    }

    #[test]
    fn test_decision_table() {
        let c = classifier();
        let follow = c.decide(Signals {
            follow_up: 0.3,
            semantic: 0.6,
            new_topic: 0.0,
            combined: 0.42,
        });
        assert_eq!(follow.query_type, QueryType::FollowUp);
        assert_eq!(follow.context_weight, 0.8);

        let related = c.decide(Signals {
            follow_up: 0.5,
            semantic: 0.1,
            new_topic: 0.0,
            combined: 0.34,
        });
        assert_eq!(related.query_type, QueryType::RelatedTopic);
        assert_eq!(related.context_weight, 0.6);
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RouteError::Embedding("service down".to_string()))
        }

        fn dimensions(&self) -> usize {
            0
        }

        fn model_name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_follow_up_floor_uses_blended_score() {
        let history = vec![message(
            "What is bread dough made of?",
            "Bread dough is made of flour, water, salt and yeast.",
        )];
        let c = QueryClassifier::new(RelevanceScorer::new(
            Arc::new(DownEmbedder),
            RoutingConfig::default(),
        ));

        // no cosine available; word overlap alone clears the floor
        let semantic = c.semantic_score("bread dough yeast", &history).await.unwrap();
        assert_eq!(semantic, 1.0);

        let result = c.classify("bread dough yeast", &history, Some("t")).await;
        assert_eq!(result.query_type, QueryType::FollowUp);
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_new_topic() {
        let config = RoutingConfig {
            classification_timeout_ms: 50,
            ..RoutingConfig::default()
        };
        let c = QueryClassifier::new(RelevanceScorer::new(Arc::new(SlowEmbedder), config));
        let result = c
            .classify("Quantum entanglement", &cooking_history(), Some("t"))
            .await;
        assert_eq!(result.query_type, QueryType::NewTopic);
        assert_eq!(result.confidence, 0.1);
        assert!(result.reasoning.contains("Classification error"));
    }
}
