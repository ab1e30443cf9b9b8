//! Database repository layer
//!
//! Provides query and insert operations for users, study sessions and notes.

use crate::analytics::stats::SubjectTotal;
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Aggregate counts across all users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewTotals {
    pub users: i64,
    pub sessions: i64,
    pub minutes: i64,
    /// Sessions dated at or after the `since` cutoff
    pub recent_sessions: i64,
    /// Distinct users with a session at or after the `since` cutoff
    pub active_users: i64,
}

/// Result of an atomic streak update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakChange {
    pub before: StreakState,
    pub after: StreakState,
}

impl StreakChange {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

/// Timestamps are stored as fixed-width RFC 3339 so text comparison orders them.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, err.into())
}

fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_day(value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(conversion_error)
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        super::schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Lock)
    }

    // ============================================
    // User operations
    // ============================================

    /// Insert a new user. Fails with [`Error::DuplicateEmail`] if the email is taken.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
            [&user.email],
            |r| r.get(0),
        )?;
        if taken {
            return Err(Error::DuplicateEmail(user.email.clone()));
        }

        conn.execute(
            r#"
            INSERT INTO users (id, name, email, role, current_streak, longest_streak,
                               last_active, created_at, last_login_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                user.streak.current,
                user.streak.longest,
                user.streak.last_active.map(|d| d.to_string()),
                ts(&user.created_at),
                user.last_login_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row("SELECT * FROM users WHERE id = ?", [id], Self::row_to_user)
            .optional()
            .map_err(Error::from)
    }

    /// Get a user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM users WHERE email = ?",
            [email],
            Self::row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Look up a user by ID or email, failing if neither matches.
    pub fn find_user(&self, id_or_email: &str) -> Result<User> {
        if let Some(user) = self.get_user(id_or_email)? {
            return Ok(user);
        }
        self.get_user_by_email(id_or_email)?
            .ok_or_else(|| Error::UserNotFound(id_or_email.to_string()))
    }

    /// List all users, oldest first
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY created_at, id")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Record a login timestamp and apply `f` to the user's streak.
    ///
    /// Both writes share one immediate transaction: if the streak update
    /// fails, the login timestamp is left untouched.
    pub fn record_login<F>(&self, user_id: &str, at: DateTime<Utc>, f: F) -> Result<StreakChange>
    where
        F: FnOnce(&StreakState) -> StreakState,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            "UPDATE users SET last_login_at = ? WHERE id = ?",
            params![ts(&at), user_id],
        )?;
        if rows == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        let change = Self::apply_streak(&tx, user_id, f)?;
        tx.commit()?;

        Ok(change)
    }

    /// Atomically read, transform and write back a user's streak.
    ///
    /// The read and the write happen in one immediate transaction while the
    /// connection lock is held, so concurrent updates for the same user are
    /// serialized rather than lost.
    pub fn update_streak<F>(&self, user_id: &str, f: F) -> Result<StreakChange>
    where
        F: FnOnce(&StreakState) -> StreakState,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let change = Self::apply_streak(&tx, user_id, f)?;
        tx.commit()?;

        Ok(change)
    }

    fn apply_streak<F>(tx: &Transaction, user_id: &str, f: F) -> Result<StreakChange>
    where
        F: FnOnce(&StreakState) -> StreakState,
    {
        let before = tx
            .query_row(
                "SELECT current_streak, longest_streak, last_active FROM users WHERE id = ?",
                [user_id],
                Self::row_to_streak,
            )
            .optional()?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let after = f(&before);

        if after != before {
            tx.execute(
                r#"
                UPDATE users
                SET current_streak = ?1, longest_streak = ?2, last_active = ?3
                WHERE id = ?4
                "#,
                params![
                    after.current,
                    after.longest,
                    after.last_active.map(|d| d.to_string()),
                    user_id,
                ],
            )?;
        }

        Ok(StreakChange { before, after })
    }

    fn row_to_streak(row: &Row) -> rusqlite::Result<StreakState> {
        let last_active: Option<String> = row.get("last_active")?;
        Ok(StreakState {
            current: row.get("current_streak")?,
            longest: row.get("longest_streak")?,
            last_active: last_active.as_deref().map(parse_day).transpose()?,
        })
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role: String = row.get("role")?;
        let created_at: String = row.get("created_at")?;
        let last_login_at: Option<String> = row.get("last_login_at")?;

        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            role: role.parse::<Role>().map_err(conversion_error)?,
            streak: Self::row_to_streak(row)?,
            created_at: parse_ts(&created_at)?,
            last_login_at: last_login_at.as_deref().map(parse_ts).transpose()?,
        })
    }

    // ============================================
    // Study session operations
    // ============================================

    /// Insert a study session
    pub fn insert_session(&self, session: &StudySession) -> Result<()> {
        let conn = self.lock()?;
        Self::write_session(&conn, session)
    }

    /// Insert a study session and apply `f` to its owner's streak.
    ///
    /// The session is only stored if the streak update also succeeds.
    pub fn log_session<F>(&self, session: &StudySession, f: F) -> Result<StreakChange>
    where
        F: FnOnce(&StreakState) -> StreakState,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let change = Self::apply_streak(&tx, &session.user_id, f)?;
        Self::write_session(&tx, session)?;
        tx.commit()?;

        Ok(change)
    }

    fn write_session(conn: &Connection, session: &StudySession) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO study_sessions (id, user_id, subject, time_spent_minutes,
                                        difficulty, date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                session.id,
                session.user_id,
                session.record.subject,
                session.record.time_spent_minutes,
                session.record.difficulty.as_str(),
                ts(&session.record.date),
                session.notes,
                ts(&session.created_at),
            ],
        )?;
        Ok(())
    }

    /// List sessions matching a filter, newest first
    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<StudySession>> {
        let conn = self.lock()?;

        let mut sql = String::from("SELECT * FROM study_sessions WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(subject) = &filter.subject {
            sql.push_str(" AND subject = ?");
            params.push(Box::new(subject.clone()));
        }

        if let Some(since) = &filter.since {
            sql.push_str(" AND date >= ?");
            params.push(Box::new(ts(since)));
        }

        if let Some(until) = &filter.until {
            sql.push_str(" AND date <= ?");
            params.push(Box::new(ts(until)));
        }

        sql.push_str(" ORDER BY date DESC, id");

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Session records for one user within `[since, until]`, for scoring.
    pub fn session_records(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let filter = SessionFilter {
            user_id: Some(user_id.to_string()),
            since: Some(since),
            until: Some(until),
            ..Default::default()
        };
        Ok(self
            .list_sessions(&filter)?
            .into_iter()
            .map(|s| s.record)
            .collect())
    }

    /// Every session timestamp recorded for a user, oldest first.
    pub fn activity_timestamps(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT date FROM study_sessions WHERE user_id = ? ORDER BY date")?;
        let dates = stmt
            .query_map([user_id], |row| {
                let s: String = row.get(0)?;
                parse_ts(&s)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<StudySession> {
        let difficulty: String = row.get("difficulty")?;
        let date: String = row.get("date")?;
        let created_at: String = row.get("created_at")?;

        Ok(StudySession {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            record: SessionRecord {
                subject: row.get("subject")?,
                time_spent_minutes: row.get("time_spent_minutes")?,
                difficulty: difficulty.parse::<Difficulty>().map_err(conversion_error)?,
                date: parse_ts(&date)?,
            },
            notes: row.get("notes")?,
            created_at: parse_ts(&created_at)?,
        })
    }

    // ============================================
    // Note operations
    // ============================================

    /// Insert a note
    pub fn insert_note(&self, note: &Note) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO notes (id, user_id, title, body, subject, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                note.id,
                note.user_id,
                note.title,
                note.body,
                note.subject,
                ts(&note.created_at),
            ],
        )?;
        Ok(())
    }

    /// List a user's notes, newest first
    pub fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT * FROM notes WHERE user_id = ? ORDER BY created_at DESC, id")?;
        let notes = stmt
            .query_map([user_id], |row| {
                let created_at: String = row.get("created_at")?;
                Ok(Note {
                    id: row.get("id")?,
                    user_id: row.get("user_id")?,
                    title: row.get("title")?,
                    body: row.get("body")?,
                    subject: row.get("subject")?,
                    created_at: parse_ts(&created_at)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Delete a note by ID
    pub fn delete_note(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM notes WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(Error::NoteNotFound(id.to_string()));
        }
        Ok(())
    }

    // ============================================
    // Admin analytics queries
    // ============================================

    /// Totals across every user. `since` bounds the "recent" counts.
    pub fn get_overview_totals(&self, since: DateTime<Utc>) -> Result<OverviewTotals> {
        let conn = self.lock()?;
        let since_str = ts(&since);

        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;

        let (sessions, minutes, recent_sessions, active_users) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(time_spent_minutes), 0),
                COALESCE(SUM(CASE WHEN date >= ?1 THEN 1 ELSE 0 END), 0),
                COUNT(DISTINCT CASE WHEN date >= ?1 THEN user_id END)
            FROM study_sessions
            "#,
            [&since_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;

        Ok(OverviewTotals {
            users,
            sessions,
            minutes,
            recent_sessions,
            active_users,
        })
    }

    /// Subjects ranked by total minutes across all users.
    pub fn get_top_subjects(&self, limit: usize) -> Result<Vec<SubjectTotal>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT subject, COUNT(*), SUM(time_spent_minutes) AS minutes
            FROM study_sessions
            GROUP BY subject
            ORDER BY minutes DESC, subject
            LIMIT ?
            "#,
        )?;
        let subjects = stmt
            .query_map([limit as i64], |r| {
                Ok(SubjectTotal {
                    subject: r.get(0)?,
                    sessions: r.get::<_, i64>(1)? as usize,
                    minutes: r.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subjects)
    }
}

/// Filter for listing sessions
#[derive(Debug, Default)]
pub struct SessionFilter {
    /// Filter by owning user
    pub user_id: Option<String>,
    /// Filter by exact subject
    pub subject: Option<String>,
    /// Sessions dated at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Sessions dated at or before this time
    pub until: Option<DateTime<Utc>>,
}
