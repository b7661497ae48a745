//! Domain types shared across routing, memory and dispatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a query relates to the thread it arrives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Explored with the three-way strategy
    #[default]
    NewTopic,
    FollowUp,
    Clarification,
    /// Answered directly, but the topic has drifted
    RelatedTopic,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::NewTopic => "new_topic",
            QueryType::FollowUp => "follow_up",
            QueryType::Clarification => "clarification",
            QueryType::RelatedTopic => "related_topic",
        }
    }

    pub fn is_continuation(&self) -> bool {
        !matches!(self, QueryType::NewTopic)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored interaction: the user query and the single response chosen for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub user_query: String,
    #[serde(default)]
    pub ai_response: String,
    #[serde(default = "epoch")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub query_type: QueryType,
    /// Context turns consulted when this response was produced
    #[serde(default)]
    pub context_used: usize,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Persisted form of a thread: its messages plus bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDocument {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

impl ThreadDocument {
    pub fn new(thread_id: impl Into<String>, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            user_id,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Fill fields that older documents lack from what the document does carry
    pub fn normalize(&mut self) {
        if self.created_at == epoch() {
            if let Some(first) = self.messages.first() {
                self.created_at = first.timestamp;
            }
        }
        if self.updated_at == epoch() {
            self.updated_at = self
                .messages
                .last()
                .map(|m| m.timestamp)
                .unwrap_or(self.created_at);
        }
        if self.user_id.is_none() {
            self.user_id = self
                .metadata
                .get("user_id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        for message in &mut self.messages {
            if message.thread_id.is_empty() {
                message.thread_id = self.thread_id.clone();
            }
            if message.message_id.is_empty() {
                message.message_id = uuid::Uuid::new_v4().to_string();
            }
        }
    }
}

/// Outcome of classifying one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub query_type: QueryType,
    pub confidence: f64,
    pub reasoning: String,
    pub should_use_context: bool,
    /// Advisory weight for how much history to lean on
    pub context_weight: f64,
}

impl ClassificationResult {
    pub fn new_topic(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::NewTopic,
            confidence,
            reasoning: reasoning.into(),
            should_use_context: false,
            context_weight: 0.0,
        }
    }
}

/// Continuation likelihood of a query against prior context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    /// Combined score multiplied by the configured scale
    pub score: f64,
    pub is_continuation: bool,
    pub reasoning: String,
    pub lexical: f64,
    /// `None` when the embedding step was skipped or failed
    pub semantic: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_serde() {
        assert_eq!(
            serde_json::to_string(&QueryType::RelatedTopic).unwrap(),
            "\"related_topic\""
        );
        let parsed: QueryType = serde_json::from_str("\"follow_up\"").unwrap();
        assert_eq!(parsed, QueryType::FollowUp);
        assert!(parsed.is_continuation());
        assert!(!QueryType::NewTopic.is_continuation());
    }

    #[test]
    fn test_legacy_document_defaults() {
        let raw = r#"{
            "thread_id": "thread_abc",
            "metadata": {"user_id": "u1"},
            "messages": [
                {"message_id": "m1", "user_query": "hi", "ai_response": "hello",
                 "timestamp": "2024-05-01T10:00:00Z"}
            ]
        }"#;
        let mut doc: ThreadDocument = serde_json::from_str(raw).unwrap();
        doc.normalize();

        assert_eq!(doc.user_id.as_deref(), Some("u1"));
        assert_eq!(doc.created_at, doc.messages[0].timestamp);
        assert_eq!(doc.updated_at, doc.messages[0].timestamp);
        let msg = &doc.messages[0];
        assert_eq!(msg.query_type, QueryType::NewTopic);
        assert_eq!(msg.context_used, 0);
        assert_eq!(msg.thread_id, "thread_abc");
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn test_legacy_message_without_ids() {
        let raw = r#"{"thread_id":"old","messages":[
            {"user_query":"hi","ai_response":"hello"},
            {"ai_response":"orphan answer"}
        ]}"#;
        let mut doc: ThreadDocument = serde_json::from_str(raw).unwrap();
        doc.normalize();

        assert_eq!(doc.messages.len(), 2);
        assert!(!doc.messages[0].message_id.is_empty());
        assert_ne!(doc.messages[0].message_id, doc.messages[1].message_id);
        assert_eq!(doc.messages[0].user_query, "hi");
        assert_eq!(doc.messages[1].user_query, "");
        assert_eq!(doc.messages[1].thread_id, "old");
    }
}
