//! Database statistics

use super::Database;
use crate::error::Result;

/// Database stats
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DatabaseStats {
    pub thread_count: usize,
    pub message_count: usize,
    pub oldest_thread: Option<String>,
    pub newest_update: Option<String>,
}

impl Database {
    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let (thread_count, message_count, oldest_thread, newest_update): (
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(message_count), 0), MIN(created_at), MAX(updated_at)
             FROM threads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(DatabaseStats {
            thread_count: thread_count as usize,
            message_count: message_count as usize,
            oldest_thread,
            newest_update,
        })
    }
}
