//! Session repository: per-session interview state and question memory

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::question::InterviewSetup;
use crate::{Error, Result};

/// Default bound on remembered questions per session
const DEFAULT_QUESTION_LIMIT: usize = 40;

/// One interview session
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: String,
    pub role: String,
    pub track: String,
    pub level: String,
    pub language: String,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session repository
#[derive(Clone)]
pub struct SessionRepo {
    pool: DbPool,
    question_limit: usize,
}

impl SessionRepo {
    /// Create a new session repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self {
            pool,
            question_limit: DEFAULT_QUESTION_LIMIT,
        }
    }

    /// Override the per-session question memory bound
    #[must_use]
    pub const fn with_question_limit(mut self, limit: usize) -> Self {
        self.question_limit = limit;
        self
    }

    /// Find or create the session for a setup, refreshing its parameters
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn find_or_create(&self, setup: &InterviewSetup) -> Result<InterviewSession> {
        let conn = self.conn()?;
        let now = now_string();

        conn.execute(
            "INSERT INTO sessions (id, role, track, level, language, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 role = excluded.role,
                 track = excluded.track,
                 level = excluded.level,
                 language = excluded.language,
                 updated_at = excluded.updated_at",
            rusqlite::params![
                setup.session_id,
                setup.role,
                setup.track.as_str(),
                setup.level.as_str(),
                setup.language.as_str(),
                now,
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        self.get(&setup.session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", setup.session_id)))
    }

    /// Fetch one session
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn get(&self, session_id: &str) -> Result<Option<InterviewSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, role, track, level, language, last_question, last_answer,
                        created_at, updated_at
                 FROM sessions WHERE id = ?1",
                [session_id],
                |row| {
                    Ok(InterviewSession {
                        id: row.get(0)?,
                        role: row.get(1)?,
                        track: row.get(2)?,
                        level: row.get(3)?,
                        language: row.get(4)?,
                        last_question: row.get(5)?,
                        last_answer: row.get(6)?,
                        created_at: parse_datetime(&row.get::<_, String>(7)?),
                        updated_at: parse_datetime(&row.get::<_, String>(8)?),
                    })
                },
            )
            .ok();
        Ok(session)
    }

    /// Record an asked question, trimming memory to the configured bound
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn record_asked(&self, session_id: &str, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(());
        }
        let conn = self.conn()?;
        let now = now_string();

        conn.execute(
            "INSERT INTO asked_questions (id, session_id, question, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![Uuid::new_v4().to_string(), session_id, question, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "UPDATE sessions SET last_question = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![question, now, session_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        // Keep only the most recent N questions per session.
        #[allow(clippy::cast_possible_wrap)]
        conn.execute(
            "DELETE FROM asked_questions
             WHERE session_id = ?1
               AND id NOT IN (
                   SELECT id FROM asked_questions
                   WHERE session_id = ?1
                   ORDER BY created_at DESC, rowid DESC
                   LIMIT ?2
               )",
            rusqlite::params![session_id, self.question_limit as i64],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// The most recent asked questions, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn asked_questions(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT question FROM asked_questions
                 WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let questions: Vec<String> = stmt
            .query_map(rusqlite::params![session_id, limit as i64], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(questions.into_iter().rev().collect())
    }

    /// Persist the latest candidate answer for a session
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn set_last_answer(&self, session_id: &str, answer: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = now_string();
        conn.execute(
            "INSERT INTO sessions (id, last_answer, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 last_answer = excluded.last_answer,
                 updated_at = excluded.updated_at",
            rusqlite::params![session_id, answer.trim(), now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Drop the least-recently-updated sessions beyond `max_sessions`
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn prune(&self, max_sessions: usize) -> Result<usize> {
        let conn = self.conn()?;
        #[allow(clippy::cast_possible_wrap)]
        let removed = conn
            .execute(
                "DELETE FROM sessions
                 WHERE id NOT IN (
                     SELECT id FROM sessions
                     ORDER BY updated_at DESC, rowid DESC
                     LIMIT ?1
                 )",
                rusqlite::params![max_sessions as i64],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(removed)
    }

    /// Number of stored sessions
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;
    use crate::question::{Language, Level, Track};

    fn setup(session_id: &str) -> InterviewSetup {
        InterviewSetup {
            role: "Backend Engineer".to_string(),
            track: Track::SystemDesign,
            level: Level::Mid,
            language: Language::En,
            session_id: session_id.to_string(),
        }
    }

    fn repo() -> SessionRepo {
        SessionRepo::new(init_memory().unwrap())
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let repo = repo();
        let a = repo.find_or_create(&setup("s1")).unwrap();
        let b = repo.find_or_create(&setup("s1")).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(b.role, "Backend Engineer");
        assert_eq!(b.track, "System Design");
    }

    #[test]
    fn asked_questions_come_back_oldest_first() {
        let repo = repo();
        repo.find_or_create(&setup("s1")).unwrap();
        repo.record_asked("s1", "q-one").unwrap();
        repo.record_asked("s1", "q-two").unwrap();
        repo.record_asked("s1", "q-three").unwrap();

        let questions = repo.asked_questions("s1", 10).unwrap();
        assert_eq!(questions, vec!["q-one", "q-two", "q-three"]);

        let session = repo.get("s1").unwrap().unwrap();
        assert_eq!(session.last_question.as_deref(), Some("q-three"));
    }

    #[test]
    fn question_memory_is_bounded() {
        let repo = SessionRepo::new(init_memory().unwrap()).with_question_limit(3);
        repo.find_or_create(&setup("s1")).unwrap();
        for i in 0..6 {
            repo.record_asked("s1", &format!("q-{i}")).unwrap();
        }

        let questions = repo.asked_questions("s1", 10).unwrap();
        assert_eq!(questions, vec!["q-3", "q-4", "q-5"]);
    }

    #[test]
    fn blank_questions_are_not_recorded() {
        let repo = repo();
        repo.find_or_create(&setup("s1")).unwrap();
        repo.record_asked("s1", "   ").unwrap();
        assert!(repo.asked_questions("s1", 10).unwrap().is_empty());
    }

    #[test]
    fn prune_drops_least_recently_updated() {
        let repo = repo();
        for i in 0..5 {
            repo.find_or_create(&setup(&format!("s{i}"))).unwrap();
        }
        // Touch s0 so it is the most recent.
        repo.set_last_answer("s0", "recent answer").unwrap();

        let removed = repo.prune(2).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(repo.count().unwrap(), 2);
        assert!(repo.get("s0").unwrap().is_some());
    }

    #[test]
    fn cascade_removes_question_memory_with_session() {
        let repo = repo();
        repo.find_or_create(&setup("s1")).unwrap();
        repo.record_asked("s1", "q").unwrap();

        let conn = repo.pool.get().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        conn.execute("DELETE FROM sessions WHERE id = 's1'", [])
            .unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM asked_questions WHERE session_id = 's1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn last_answer_upserts_missing_session() {
        let repo = repo();
        repo.set_last_answer("fresh", "my answer").unwrap();
        let session = repo.get("fresh").unwrap().unwrap();
        assert_eq!(session.last_answer.as_deref(), Some("my answer"));
    }
}
