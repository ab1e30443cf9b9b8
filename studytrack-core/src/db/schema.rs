//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: users and study sessions
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        email            TEXT NOT NULL UNIQUE,
        role             TEXT NOT NULL DEFAULT 'student',

        -- Streak state, written only via Database::update_streak
        current_streak   INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
        longest_streak   INTEGER NOT NULL DEFAULT 0,
        last_active      TEXT,

        created_at       DATETIME NOT NULL,
        last_login_at    DATETIME,

        CHECK (longest_streak >= current_streak)
    );

    CREATE TABLE IF NOT EXISTS study_sessions (
        id                 TEXT PRIMARY KEY,
        user_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        subject            TEXT NOT NULL,
        time_spent_minutes INTEGER NOT NULL CHECK (time_spent_minutes >= 1),
        difficulty         TEXT NOT NULL,
        date               DATETIME NOT NULL,
        notes              TEXT,
        created_at         DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON study_sessions(user_id, date);
    CREATE INDEX IF NOT EXISTS idx_sessions_subject ON study_sessions(subject);
    "#,
    // Version 2: notes
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title            TEXT NOT NULL,
        body             TEXT NOT NULL,
        subject          TEXT,
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id, created_at);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["users", "study_sessions", "notes"] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_streak_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO users (id, name, email, current_streak, longest_streak, created_at)
             VALUES ('u1', 'A', 'a@example.com', 5, 2, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err(), "longest below current must be rejected");
    }
}
