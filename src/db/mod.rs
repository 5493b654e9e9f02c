//! Database module for interview session persistence

mod schema;
mod session;

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

pub use schema::SCHEMA_VERSION;
pub use session::{InterviewSession, SessionRepo};

use crate::{Error, Result};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if the database cannot be opened or migrated
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON"));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if the database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON"));
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_memory_builds_schema() {
        let pool = init_memory().unwrap();
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sessions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
