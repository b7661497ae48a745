//! Thread document storage

use super::Database;
use crate::error::Result;
use crate::types::ThreadDocument;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

/// Fixed-width RFC 3339 so stored timestamps compare lexicographically
pub(crate) fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Listing row summarising a thread without decoding its document
#[derive(Debug, Clone, serde::Serialize)]
pub struct ThreadRow {
    pub thread_id: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
    pub first_query: Option<String>,
    pub last_query: Option<String>,
}

impl Database {
    /// Insert or replace a thread document. A single statement, so the
    /// document is either fully written or not at all.
    pub fn upsert_thread(&self, doc: &ThreadDocument) -> Result<()> {
        let json = serde_json::to_string(doc)?;
        self.conn.execute(
            "INSERT INTO threads (id, user_id, created_at, updated_at, message_count, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                updated_at = excluded.updated_at,
                message_count = excluded.message_count,
                doc = excluded.doc",
            params![
                doc.thread_id,
                doc.user_id,
                timestamp(&doc.created_at),
                timestamp(&doc.updated_at),
                doc.messages.len() as i64,
                json,
            ],
        )?;
        Ok(())
    }

    /// Load a thread document, filling fields older documents lack
    pub fn get_thread(&self, thread_id: &str) -> Result<Option<ThreadDocument>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM threads WHERE id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => {
                let mut doc: ThreadDocument = serde_json::from_str(&json)?;
                if doc.thread_id.is_empty() {
                    doc.thread_id = thread_id.to_string();
                }
                doc.normalize();
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    pub fn thread_exists(&self, thread_id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM threads WHERE id = ?1)",
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete threads created before `cutoff`, returning their ids
    pub fn delete_threads_created_before(&self, cutoff: &DateTime<Utc>) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM threads WHERE created_at < ?1 RETURNING id")?;
        let ids = stmt
            .query_map(params![timestamp(cutoff)], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Threads ordered by most recent update, optionally only one user's
    pub fn list_threads(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ThreadRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, created_at, updated_at, message_count,
                    json_extract(doc, '$.messages[0].user_query'),
                    json_extract(doc, '$.messages[#-1].user_query')
             FROM threads
             WHERE ?1 IS NULL OR user_id = ?1
             ORDER BY updated_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt
            .query_map(params![user_id, limit as i64, offset as i64], |row| {
                Ok(ThreadRow {
                    thread_id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                    message_count: row.get::<_, i64>(4)? as usize,
                    first_query: row.get(5)?,
                    last_query: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
