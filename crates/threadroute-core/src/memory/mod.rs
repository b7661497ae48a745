//! Conversation memory
//!
//! Owns every thread and message. History stays clean: one stored message per
//! interaction holding the query and the single response chosen for it.
//! Reads go through a bounded TTL cache; the store is the source of truth.

mod store;

pub use store::{InMemoryThreadStore, SqliteThreadStore, ThreadStore};

use crate::cache::TtlCache;
use crate::config::MemoryConfig;
use crate::db::{DatabaseStats, ThreadRow};
use crate::error::{Result, RouteError};
use crate::types::{Message, QueryType, ThreadDocument};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Overview of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub user_id: Option<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub first_query: Option<String>,
    pub last_query: Option<String>,
    /// Distinct query types, in order of first appearance
    pub query_types: Vec<QueryType>,
}

/// Memory-wide counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_threads: usize,
    pub total_messages: usize,
    pub avg_messages_per_thread: f64,
    pub cached_threads: usize,
    pub cache_capacity: usize,
    #[serde(flatten)]
    pub store: DatabaseStats,
}

/// Turns a stored message contributes to a prompt (user + assistant)
pub const TURNS_PER_MESSAGE: usize = 2;

/// Context turns represented by `messages`
pub fn context_turns(messages: &[Message]) -> usize {
    messages.len() * TURNS_PER_MESSAGE
}

pub struct ConversationMemory {
    store: Arc<dyn ThreadStore>,
    cache: TtlCache<String, Arc<ThreadDocument>>,
    config: MemoryConfig,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn ThreadStore>, config: MemoryConfig) -> Self {
        let cache = TtlCache::new(config.cache_max_threads, config.cache_ttl());
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Time-ordered, collision-resistant thread id
    pub fn new_thread_id() -> String {
        format!("thread_{}", uuid::Uuid::now_v7().simple())
    }

    /// Cached document, falling back to the store
    async fn load(&self, thread_id: &str) -> Result<Option<Arc<ThreadDocument>>> {
        let key = thread_id.to_string();
        if let Some(doc) = self.cache.get(&key) {
            tracing::trace!(thread_id, "Thread cache hit");
            return Ok(Some(doc));
        }

        match self.store.load(thread_id).await? {
            Some(doc) => {
                let doc = Arc::new(doc);
                self.cache.insert(key, doc.clone());
                tracing::debug!(thread_id, messages = doc.messages.len(), "Thread loaded from store");
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Append one clean message to a thread, creating the thread if needed.
    ///
    /// The write reaches the store before the cache; a failed write is logged
    /// and returned, leaving the cache untouched.
    pub async fn add_interaction(
        &self,
        thread_id: &str,
        user_query: &str,
        ai_response: &str,
        query_type: QueryType,
        context_used: usize,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Message> {
        let now = Utc::now();
        let mut doc = match self.load(thread_id).await? {
            Some(existing) => existing.as_ref().clone(),
            None => {
                let user_id = metadata
                    .get("user_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                ThreadDocument::new(thread_id, user_id)
            }
        };

        let message = Message {
            message_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            user_query: user_query.to_string(),
            ai_response: ai_response.to_string(),
            timestamp: now,
            query_type,
            context_used,
            metadata,
        };
        doc.messages.push(message.clone());
        doc.updated_at = now;

        if let Err(e) = self.store.save(&doc).await {
            tracing::error!(
                thread_id,
                message_id = %message.message_id,
                error = %e,
                "Failed to persist interaction"
            );
            return Err(e);
        }

        self.cache.insert(thread_id.to_string(), Arc::new(doc));
        tracing::info!(
            thread_id,
            message_id = %message.message_id,
            query_type = %query_type,
            context_used,
            "Interaction stored"
        );

        Ok(message)
    }

    /// Last `limit` messages, oldest first; empty for unknown threads
    pub async fn get_history(&self, thread_id: &str, limit: usize) -> Result<Vec<Message>> {
        Ok(match self.load(thread_id).await? {
            Some(doc) => tail(&doc.messages, limit).to_vec(),
            None => Vec::new(),
        })
    }

    /// Context window size in turns for a query type
    pub fn context_window_turns(&self, query_type: QueryType) -> usize {
        match query_type {
            QueryType::NewTopic => 0,
            QueryType::Clarification => self.config.clarification_context_turns,
            QueryType::RelatedTopic => self.config.related_context_turns,
            QueryType::FollowUp => self.config.follow_up_context_turns,
        }
    }

    /// Recent messages covering the turn window for `query_type`
    pub async fn get_context_for_query(
        &self,
        thread_id: &str,
        query_type: QueryType,
    ) -> Result<Vec<Message>> {
        let turns = self.context_window_turns(query_type);
        if turns == 0 {
            return Ok(Vec::new());
        }

        let history = self
            .get_history(thread_id, self.config.context_load_limit)
            .await?;
        let wanted = turns.div_ceil(TURNS_PER_MESSAGE);
        let context = tail(&history, wanted).to_vec();

        tracing::debug!(
            thread_id,
            query_type = %query_type,
            messages = context.len(),
            turns = context_turns(&context),
            "Context retrieved"
        );
        Ok(context)
    }

    pub async fn thread_exists(&self, thread_id: &str) -> Result<bool> {
        if self.cache.get(&thread_id.to_string()).is_some() {
            return Ok(true);
        }
        self.store.exists(thread_id).await
    }

    pub async fn thread_summary(&self, thread_id: &str) -> Result<Option<ThreadSummary>> {
        let Some(doc) = self.load(thread_id).await? else {
            return Ok(None);
        };

        let mut query_types = Vec::new();
        for m in &doc.messages {
            if !query_types.contains(&m.query_type) {
                query_types.push(m.query_type);
            }
        }

        Ok(Some(ThreadSummary {
            thread_id: doc.thread_id.clone(),
            user_id: doc.user_id.clone(),
            message_count: doc.messages.len(),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            first_query: doc.messages.first().map(|m| m.user_query.clone()),
            last_query: doc.messages.last().map(|m| m.user_query.clone()),
            query_types,
        }))
    }

    /// Thread listing, most recently updated first; `user_id` lists one user's threads
    pub async fn list_threads(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ThreadRow>> {
        self.store.list(user_id, limit, offset).await
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        let store = self.store.stats().await?;
        Ok(MemoryStats {
            total_threads: store.thread_count,
            total_messages: store.message_count,
            avg_messages_per_thread: if store.thread_count > 0 {
                store.message_count as f64 / store.thread_count as f64
            } else {
                0.0
            },
            cached_threads: self.cache.stats().active_entries,
            cache_capacity: self.cache.capacity(),
            store,
        })
    }

    /// Delete threads older than `max_age_days` (the configured retention
    /// when `None`) from the store and the cache
    pub async fn sweep_expired(&self, max_age_days: Option<i64>) -> Result<usize> {
        let days = max_age_days.unwrap_or(self.config.retention_days);
        let cutoff = retention_cutoff(Utc::now(), days)?;

        let removed = self.store.delete_created_before(cutoff).await?;
        for id in &removed {
            self.cache.remove(id);
        }
        self.cache.cleanup();

        tracing::info!(max_age_days = days, removed = removed.len(), "Retention sweep finished");
        Ok(removed.len())
    }
}

/// Creation time before which a thread counts as expired
fn retention_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if days < 0 {
        return Err(RouteError::InvalidInput(format!(
            "max age must not be negative, got {} days",
            days
        )));
    }
    TimeDelta::try_days(days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| {
            RouteError::InvalidInput(format!("max age of {} days is out of range", days))
        })
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;

    fn memory() -> ConversationMemory {
        ConversationMemory::new(Arc::new(InMemoryThreadStore::new()), MemoryConfig::default())
    }

    async fn seed(memory: &ConversationMemory, thread_id: &str, n: usize) {
        for i in 0..n {
            memory
                .add_interaction(
                    thread_id,
                    &format!("question {}", i),
                    &format!("answer {}", i),
                    QueryType::FollowUp,
                    0,
                    HashMap::new(),
                )
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_thread_ids_are_unique_and_prefixed() {
        let a = ConversationMemory::new_thread_id();
        let b = ConversationMemory::new_thread_id();
        assert!(a.starts_with("thread_"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_one_message_per_interaction() {
        let memory = memory();
        seed(&memory, "t", 3).await;

        let history = memory.get_history("t", 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].user_query, "question 0");
        assert_eq!(history[2].ai_response, "answer 2");

        let limited = memory.get_history("t", 2).await.unwrap();
        assert_eq!(limited[0].user_query, "question 1");
    }

    #[tokio::test]
    async fn test_history_for_unknown_thread_is_empty() {
        assert!(memory().get_history("nope", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_windows_are_monotonic() {
        let memory = memory();
        seed(&memory, "t", 8).await;

        let mut sizes = Vec::new();
        for qt in [
            QueryType::NewTopic,
            QueryType::Clarification,
            QueryType::RelatedTopic,
            QueryType::FollowUp,
        ] {
            let ctx = memory.get_context_for_query("t", qt).await.unwrap();
            sizes.push(context_turns(&ctx));
        }
        assert_eq!(sizes, vec![0, 2, 4, 6]);
    }

    #[tokio::test]
    async fn test_context_window_shorter_history() {
        let memory = memory();
        seed(&memory, "t", 1).await;
        let ctx = memory
            .get_context_for_query("t", QueryType::FollowUp)
            .await
            .unwrap();
        assert_eq!(ctx.len(), 1);
    }

    #[tokio::test]
    async fn test_user_id_taken_from_metadata() {
        let memory = memory();
        let mut meta = HashMap::new();
        meta.insert("user_id".to_string(), serde_json::json!("alice"));
        memory
            .add_interaction("t", "q", "a", QueryType::NewTopic, 0, meta)
            .await
            .unwrap();

        let summary = memory.thread_summary("t").await.unwrap().unwrap();
        assert_eq!(summary.user_id.as_deref(), Some("alice"));
        assert_eq!(summary.first_query.as_deref(), Some("q"));
        assert_eq!(summary.query_types, vec![QueryType::NewTopic]);
    }

    #[tokio::test]
    async fn test_stats_and_exists() {
        let memory = memory();
        seed(&memory, "a", 2).await;
        seed(&memory, "b", 4).await;

        assert!(memory.thread_exists("a").await.unwrap());
        assert!(!memory.thread_exists("c").await.unwrap());

        let stats = memory.stats().await.unwrap();
        assert_eq!(stats.total_threads, 2);
        assert_eq!(stats.total_messages, 6);
        assert_eq!(stats.avg_messages_per_thread, 3.0);
        assert_eq!(stats.cache_capacity, 100);
    }

    #[tokio::test]
    async fn test_sweep_evicts_cache() {
        let store = Arc::new(InMemoryThreadStore::new());
        let memory = ConversationMemory::new(store.clone(), MemoryConfig::default());
        seed(&memory, "t", 1).await;

        let mut doc = store.load("t").await.unwrap().unwrap();
        doc.created_at = Utc::now() - Duration::days(60);
        store.save(&doc).await.unwrap();

        assert_eq!(memory.sweep_expired(None).await.unwrap(), 1);
        assert!(!memory.thread_exists("t").await.unwrap());
        assert!(memory.get_history("t", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_rejects_negative_age() {
        let memory = memory();
        seed(&memory, "t", 1).await;

        let err = memory.sweep_expired(Some(-1)).await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput(_)));
        assert!(memory.thread_exists("t").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_rejects_out_of_range_age() {
        let memory = memory();
        seed(&memory, "t", 1).await;

        let err = memory.sweep_expired(Some(200_000_000)).await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput(_)));
        let err = memory.sweep_expired(Some(i64::MAX)).await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput(_)));
        assert!(memory.thread_exists("t").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_zero_age_keeps_nothing_older_than_now() {
        let memory = memory();
        seed(&memory, "t", 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(memory.sweep_expired(Some(0)).await.unwrap(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl ThreadStore for BrokenStore {
        async fn load(&self, _: &str) -> Result<Option<ThreadDocument>> {
            Ok(None)
        }
        async fn save(&self, _: &ThreadDocument) -> Result<()> {
            Err(RouteError::Persistence("disk full".to_string()))
        }
        async fn exists(&self, _: &str) -> Result<bool> {
            Ok(false)
        }
        async fn delete_created_before(&self, _: DateTime<Utc>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn list(&self, _: Option<&str>, _: usize, _: usize) -> Result<Vec<ThreadRow>> {
            Ok(Vec::new())
        }
        async fn stats(&self) -> Result<DatabaseStats> {
            Ok(DatabaseStats::default())
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_raised_and_not_cached() {
        let memory = ConversationMemory::new(Arc::new(BrokenStore), MemoryConfig::default());
        let err = memory
            .add_interaction("t", "q", "a", QueryType::NewTopic, 0, HashMap::new())
            .await
            .unwrap_err();
        assert!(err.is_boundary_failure());
        assert!(memory.get_history("t", 10).await.unwrap().is_empty());
    }
}
