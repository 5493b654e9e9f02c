//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Interview sessions, keyed by the opaque client session identifier
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL DEFAULT '',
            track TEXT NOT NULL DEFAULT '',
            level TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL DEFAULT 'en',
            last_question TEXT,
            last_answer TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Questions already asked in a session, oldest first
        CREATE TABLE IF NOT EXISTS asked_questions (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            question TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_asked_questions_session
            ON asked_questions(session_id, created_at);

        PRAGMA user_version = 1;
        ",
    )?;
    Ok(())
}
