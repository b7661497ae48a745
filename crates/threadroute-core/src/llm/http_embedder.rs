//! HTTP-based embedder using an OpenAI-compatible `/v1/embeddings` service

use super::Embedder;
use crate::cache::{embedding_cache_key, TtlCache};
use crate::config::EmbeddingConfig;
use crate::error::{Result, RouteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const EMBEDDING_CACHE_CAPACITY: usize = 2048;
const EMBEDDING_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Embedder that uses an external HTTP service (vLLM, OpenAI, TEI, etc.)
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    config: EmbeddingConfig,
    cache: TtlCache<String, Arc<Vec<f32>>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create from configuration; fails when no url is configured
    pub fn from_config(config: EmbeddingConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| RouteError::Config("embedding.url is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url: url.trim_end_matches('/').to_string(),
            config,
            cache: TtlCache::new(EMBEDDING_CACHE_CAPACITY, EMBEDDING_CACHE_TTL),
        })
    }

    async fn fetch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut req = self
            .http_client
            .post(format!("{}/v1/embeddings", self.url))
            .json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| RouteError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RouteError::Embedding(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RouteError::Embedding(e.to_string()))?;

        if body.data.len() != texts.len() {
            return Err(RouteError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RouteError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = embedding_cache_key(&self.config.model, text);
            match self.cache.get(&key) {
                Some(cached) => results.push(Some(cached.as_ref().clone())),
                None => {
                    results.push(None);
                    uncached_texts.push(text.clone());
                    uncached_indices.push(i);
                }
            }
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                cached = texts.len() - uncached_texts.len(),
                fetching = uncached_texts.len(),
                "Embedding batch"
            );

            let fetched = self.fetch(&uncached_texts).await?;
            for ((idx, text), embedding) in uncached_indices
                .into_iter()
                .zip(uncached_texts.iter())
                .zip(fetched)
            {
                self.cache.insert(
                    embedding_cache_key(&self.config.model, text),
                    Arc::new(embedding.clone()),
                );
                results[idx] = Some(embedding);
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| RouteError::Embedding("Missing embedding".to_string())))
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_url() {
        let config = EmbeddingConfig {
            url: None,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            HttpEmbedder::from_config(config),
            Err(RouteError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_embeddings_skip_network() {
        let config = EmbeddingConfig {
            url: Some("http://127.0.0.1:9".to_string()),
            ..EmbeddingConfig::default()
        };
        let embedder = HttpEmbedder::from_config(config).unwrap();
        let key = embedding_cache_key(embedder.model_name(), "hello");
        embedder.cache.insert(key, Arc::new(vec![1.0, 0.0]));

        // nothing listens on the discard port, so a fetch would fail
        let v = embedder.embed("hello").await.unwrap();
        assert_eq!(v, vec![1.0, 0.0]);
    }
}
