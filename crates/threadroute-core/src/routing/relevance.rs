//! Continuation scoring of a query against prior conversation text

use super::{cosine_similarity, tokenize};
use crate::config::RoutingConfig;
use crate::llm::Embedder;
use crate::types::RelevanceResult;
use std::collections::HashSet;
use std::sync::Arc;

/// Blends lexical overlap with embedding similarity.
///
/// `combined = semantic_weight * cosine + lexical_weight * overlap`, then
/// multiplied by `score_scale`. With the default weights and scale the score
/// stays within 0-1.
#[derive(Clone)]
pub struct RelevanceScorer {
    embedder: Arc<dyn Embedder>,
    config: RoutingConfig,
}

impl RelevanceScorer {
    pub fn new(embedder: Arc<dyn Embedder>, config: RoutingConfig) -> Self {
        Self { embedder, config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub async fn score(&self, query: &str, prior_context: &str) -> RelevanceResult {
        if prior_context.trim().is_empty() {
            return RelevanceResult {
                score: 0.0,
                is_continuation: false,
                reasoning: "no prior context".to_string(),
                lexical: 0.0,
                semantic: None,
            };
        }

        let lexical = lexical_overlap(query, prior_context);
        let semantic = match self.semantic_similarity(query, prior_context).await {
            Ok(sim) => Some(sim),
            Err(e) => {
                tracing::warn!(error = %e, "Embedding failed, scoring lexical overlap only");
                None
            }
        };

        let combined = match semantic {
            Some(sim) => {
                let weight_sum = self.config.semantic_weight + self.config.lexical_weight;
                if weight_sum > 0.0 {
                    (self.config.semantic_weight * sim.max(0.0)
                        + self.config.lexical_weight * lexical)
                        / weight_sum
                } else {
                    0.0
                }
            }
            None => lexical,
        };
        let score = combined * self.config.score_scale;
        let is_continuation = score >= self.config.continuation_threshold;

        let reasoning = match semantic {
            Some(sim) => format!(
                "lexical overlap {:.3}, semantic similarity {:.3}, combined {:.3}",
                lexical, sim, score
            ),
            None => format!("lexical overlap {:.3} (semantic unavailable)", lexical),
        };

        tracing::debug!(lexical, semantic = ?semantic, score, is_continuation, "Relevance scored");

        RelevanceResult {
            score,
            is_continuation,
            reasoning,
            lexical,
            semantic,
        }
    }

    async fn semantic_similarity(&self, query: &str, context: &str) -> crate::Result<f64> {
        let texts = [query.to_string(), context.to_string()];
        let embeddings = self.embedder.embed_batch(&texts).await?;
        match embeddings.as_slice() {
            [q, c] => Ok(cosine_similarity(q, c).clamp(-1.0, 1.0)),
            _ => Err(crate::RouteError::Embedding(format!(
                "Expected 2 embeddings, got {}",
                embeddings.len()
            ))),
        }
    }
}

/// Share of the query's distinct words that also occur in `context`
pub fn lexical_overlap(query: &str, context: &str) -> f64 {
    let query_words: HashSet<String> = tokenize(query).collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let context_words: HashSet<String> = tokenize(context).collect();
    let shared = query_words.intersection(&context_words).count();
    shared as f64 / query_words.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, RouteError};
    use crate::llm::HashEmbedder;
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RouteError::Embedding("service down".to_string()))
        }

        fn dimensions(&self) -> usize {
            0
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(Arc::new(HashEmbedder::default()), RoutingConfig::default())
    }

    #[test]
    fn test_lexical_overlap() {
        assert_eq!(lexical_overlap("rust borrow checker", "the borrow checker in rust"), 1.0);
        assert_eq!(lexical_overlap("rust traits", "python classes"), 0.0);
        assert_eq!(lexical_overlap("", "anything"), 0.0);
        assert!((lexical_overlap("rust and go", "rust only") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_context() {
        let result = scorer().score("anything", "   ").await;
        assert_eq!(result.score, 0.0);
        assert!(!result.is_continuation);
        assert_eq!(result.reasoning, "no prior context");
    }

    #[tokio::test]
    async fn test_related_scores_higher() {
        let s = scorer();
        let context = "Machine learning trains models on data to make predictions.";
        let related = s.score("How are machine learning models trained?", context).await;
        let unrelated = s.score("Best hiking trails in Norway", context).await;
        assert!(related.score > unrelated.score);
        assert!(related.semantic.is_some());
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_lexical() {
        let s = RelevanceScorer::new(Arc::new(FailingEmbedder), RoutingConfig::default());
        let result = s.score("borrow checker", "the borrow checker").await;
        assert_eq!(result.semantic, None);
        assert_eq!(result.score, 1.0);
        assert!(result.is_continuation);
    }

    #[tokio::test]
    async fn test_scale_applies() {
        let config = RoutingConfig {
            score_scale: 10.0,
            continuation_threshold: 4.0,
            ..RoutingConfig::default()
        };
        let s = RelevanceScorer::new(Arc::new(FailingEmbedder), config);
        let result = s.score("borrow checker", "the borrow checker").await;
        assert_eq!(result.score, 10.0);
        assert!(result.is_continuation);
    }

    proptest! {
        #[test]
        fn prop_score_is_deterministic_and_bounded(
            query in "[a-z ]{1,40}",
            context in "[a-z ]{1,80}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let s = scorer();
            let first = rt.block_on(s.score(&query, &context));
            let second = rt.block_on(s.score(&query, &context));
            prop_assert_eq!(&first, &second);
            prop_assert!(first.score >= 0.0 && first.score <= 1.0 + 1e-9);
        }
    }
}
