//! Database schema and initialization

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Main database handle
pub struct Database {
    pub(crate) conn: Connection,
}

pub(crate) const SCHEMA_VERSION: i32 = 2;

const CREATE_TABLES: &str = r#"
-- One JSON document per conversation thread
CREATE TABLE IF NOT EXISTS threads (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    message_count INTEGER NOT NULL DEFAULT 0,
    doc TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_threads_created_at ON threads(created_at);
CREATE INDEX IF NOT EXISTS idx_threads_updated_at ON threads(updated_at);
"#;

impl Database {
    /// Open database at path, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_TABLES)?;

        // Migrations run before the version is stamped
        self.migrate()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }

    /// Run migrations to upgrade schema to current version
    pub fn migrate(&self) -> Result<()> {
        let current = self.schema_version()?.unwrap_or(0);

        if current < 2 {
            self.migrate_to_v2()?;
        }

        Ok(())
    }

    /// v1 stored only `id`, timestamps and `doc`; v2 lifts `user_id` and
    /// `message_count` out of the document for listing and stats.
    fn migrate_to_v2(&self) -> Result<()> {
        for (column, ddl) in [
            ("user_id", "ALTER TABLE threads ADD COLUMN user_id TEXT"),
            (
                "message_count",
                "ALTER TABLE threads ADD COLUMN message_count INTEGER NOT NULL DEFAULT 0",
            ),
        ] {
            let exists: bool = self
                .conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM pragma_table_info('threads') WHERE name = ?1",
                    params![column],
                    |row| row.get(0),
                )
                .unwrap_or(false);

            if !exists {
                self.conn.execute(ddl, [])?;
            }
        }

        // Backfill from the stored documents
        self.conn.execute(
            "UPDATE threads SET
                message_count = COALESCE(json_array_length(doc, '$.messages'), 0),
                user_id = COALESCE(user_id, json_extract(doc, '$.user_id'), json_extract(doc, '$.metadata.user_id'))
             WHERE json_valid(doc)",
            [],
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![2],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_migration_v1_to_v2() {
        let db = Database::open_in_memory().unwrap();

        db.conn
            .execute_batch(
                r#"CREATE TABLE threads (
                    id TEXT PRIMARY KEY,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                INSERT INTO schema_version VALUES (1);
                INSERT INTO threads VALUES (
                    'thread_old', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z',
                    '{"thread_id":"thread_old","metadata":{"user_id":"legacy"},"messages":[{"message_id":"m1","user_query":"q","ai_response":"a"}]}'
                );"#,
            )
            .unwrap();

        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), Some(2));

        let (user, count): (Option<String>, i64) = db
            .conn
            .query_row(
                "SELECT user_id, message_count FROM threads WHERE id = 'thread_old'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(user.as_deref(), Some("legacy"));
        assert_eq!(count, 1);
    }
}
