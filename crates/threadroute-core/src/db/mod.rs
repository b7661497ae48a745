//! Database layer for threadroute
//!
//! SQLite storage of conversation threads, one JSON document per thread.

mod schema;
mod stats;
mod threads;

pub use schema::Database;
pub use stats::DatabaseStats;
pub use threads::ThreadRow;
pub(crate) use threads::timestamp;
use std::path::PathBuf;

impl Database {
    /// `THREADROUTE_DB` if set, otherwise the per-user cache directory
    pub fn default_path() -> PathBuf {
        std::env::var("THREADROUTE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::cache_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(crate::CACHE_DIR_NAME)
                    .join("threads.sqlite")
            })
    }
}
