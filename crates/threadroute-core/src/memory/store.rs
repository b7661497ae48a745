//! Durable thread storage behind a narrow document interface

use crate::db::{timestamp, Database, DatabaseStats, ThreadRow};
use crate::error::{Result, RouteError};
use crate::types::ThreadDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

/// Document store keyed by thread id. Saves replace the whole document.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadDocument>>;

    /// Insert or replace; concurrent saves to one thread resolve last-write-wins
    async fn save(&self, doc: &ThreadDocument) -> Result<()>;

    async fn exists(&self, thread_id: &str) -> Result<bool>;

    /// Remove threads created before `cutoff`, returning the removed ids
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;

    /// Threads ordered by most recent update; `user_id` restricts to one owner
    async fn list(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ThreadRow>>;

    async fn stats(&self) -> Result<DatabaseStats>;
}

/// SQLite-backed store
pub struct SqliteThreadStore {
    db: Mutex<Database>,
}

impl SqliteThreadStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        db.initialize()?;
        Ok(Self::from_database(db))
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.initialize()?;
        Ok(Self::from_database(db))
    }

    /// Wrap an already initialized database
    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| RouteError::Persistence("database mutex poisoned".to_string()))
    }
}

#[async_trait]
impl ThreadStore for SqliteThreadStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadDocument>> {
        self.db()?.get_thread(thread_id)
    }

    async fn save(&self, doc: &ThreadDocument) -> Result<()> {
        self.db()?.upsert_thread(doc)
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        self.db()?.thread_exists(thread_id)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        self.db()?.delete_threads_created_before(&cutoff)
    }

    async fn list(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ThreadRow>> {
        self.db()?.list_threads(user_id, limit, offset)
    }

    async fn stats(&self) -> Result<DatabaseStats> {
        self.db()?.get_stats()
    }
}

/// Process-local store for tests and throwaway sessions
#[derive(Default)]
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<String, ThreadDocument>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, ThreadDocument>>> {
        self.threads
            .read()
            .map_err(|_| RouteError::Persistence("thread map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, ThreadDocument>>> {
        self.threads
            .write()
            .map_err(|_| RouteError::Persistence("thread map lock poisoned".to_string()))
    }
}

fn row(doc: &ThreadDocument) -> ThreadRow {
    ThreadRow {
        thread_id: doc.thread_id.clone(),
        user_id: doc.user_id.clone(),
        created_at: timestamp(&doc.created_at),
        updated_at: timestamp(&doc.updated_at),
        message_count: doc.messages.len(),
        first_query: doc.messages.first().map(|m| m.user_query.clone()),
        last_query: doc.messages.last().map(|m| m.user_query.clone()),
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadDocument>> {
        Ok(self.read()?.get(thread_id).cloned())
    }

    async fn save(&self, doc: &ThreadDocument) -> Result<()> {
        self.write()?.insert(doc.thread_id.clone(), doc.clone());
        Ok(())
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(thread_id))
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut threads = self.write()?;
        let expired: Vec<String> = threads
            .values()
            .filter(|d| d.created_at < cutoff)
            .map(|d| d.thread_id.clone())
            .collect();
        for id in &expired {
            threads.remove(id);
        }
        Ok(expired)
    }

    async fn list(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ThreadRow>> {
        let threads = self.read()?;
        let mut docs: Vec<&ThreadDocument> = threads
            .values()
            .filter(|d| user_id.is_none() || d.user_id.as_deref() == user_id)
            .collect();
        docs.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.thread_id.cmp(&a.thread_id))
        });
        Ok(docs.into_iter().skip(offset).take(limit).map(row).collect())
    }

    async fn stats(&self) -> Result<DatabaseStats> {
        let threads = self.read()?;
        Ok(DatabaseStats {
            thread_count: threads.len(),
            message_count: threads.values().map(|d| d.messages.len()).sum(),
            oldest_thread: threads.values().map(|d| d.created_at).min().map(|t| timestamp(&t)),
            newest_update: threads.values().map(|d| d.updated_at).max().map(|t| timestamp(&t)),
        })
    }
}
