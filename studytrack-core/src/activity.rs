//! Trigger points for streak updates and statistics retrieval.
//!
//! Login, session logging and the daily sweep all delegate to
//! [`crate::analytics::streak`]; none of them do date arithmetic of their own.

use chrono::{DateTime, Duration, Local, Utc};

use crate::analytics::productivity::ProductivityScorer;
use crate::analytics::stats::StudyStats;
use crate::analytics::streak::{self, StreakStatus};
use crate::config::{Config, DayBoundary};
use crate::db::repo::StreakChange;
use crate::error::{Error, Result};
use crate::types::{NewSession, Note, StudySession, User};
use crate::Database;

/// Result of a daily sweep across all users.
#[derive(Debug, Default)]
pub struct SweepResult {
    /// Users examined
    pub users_seen: usize,
    /// Users whose streak changed
    pub updated: usize,
    /// Users whose streak was already current
    pub unchanged: usize,
    /// Users with no qualifying activity
    pub skipped: usize,
    /// Per-user failures (user ID → error message)
    pub errors: Vec<(String, String)>,
}

/// A user's statistics with their streak as of today.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub user: User,
    pub streak_status: StreakStatus,
    /// Streak length to display today (0 once broken)
    pub display_streak: u32,
    pub window_start: DateTime<Utc>,
    pub stats: StudyStats,
}

/// Records qualifying activity and serves statistics against one database.
pub struct ActivityRecorder<'a> {
    db: &'a Database,
    config: &'a Config,
    scorer: ProductivityScorer,
}

impl<'a> ActivityRecorder<'a> {
    pub fn new(db: &'a Database, config: &'a Config) -> Self {
        Self {
            db,
            config,
            scorer: ProductivityScorer::new(config.scoring.clone()),
        }
    }

    fn boundary(&self) -> DayBoundary {
        self.config.streak.day_boundary
    }

    /// Record a login. Counts toward the streak unless disabled in config.
    pub fn record_login(&self, user_id: &str, now: DateTime<Utc>) -> Result<StreakChange> {
        let today = self.boundary().calendar_day(now);
        let count = self.config.streak.count_logins;
        let change = self.db.record_login(user_id, now, |s| {
            if count {
                streak::record_activity_on(s, today)
            } else {
                *s
            }
        })?;

        tracing::info!(
            user_id,
            current = change.after.current,
            longest = change.after.longest,
            "Login recorded"
        );
        Ok(change)
    }

    /// Validate and store a study session, counting it toward the streak on
    /// the session's own date. Nothing is stored if either write fails.
    pub fn log_session(
        &self,
        user_id: &str,
        input: NewSession,
        now: DateTime<Utc>,
    ) -> Result<(StudySession, StreakChange)> {
        if self.db.get_user(user_id)?.is_none() {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        let (record, notes) = input.into_record(now)?;
        let session = StudySession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            record,
            notes,
            created_at: now,
        };
        let day = self.boundary().calendar_day(session.record.date);
        let change = self
            .db
            .log_session(&session, |s| streak::record_activity_on(s, day))?;

        tracing::info!(
            user_id,
            session_id = %session.id,
            subject = %session.record.subject,
            minutes = session.record.time_spent_minutes,
            current = change.after.current,
            "Session logged"
        );
        Ok((session, change))
    }

    /// Reconcile every user's streak against their stored activity.
    ///
    /// Each user is replayed against their own history; users without any
    /// qualifying activity are skipped. A failure for one user is recorded
    /// and the sweep moves on.
    pub fn run_daily_sweep(&self, now: DateTime<Utc>) -> Result<SweepResult> {
        let mut result = SweepResult::default();
        let users = self.db.list_users()?;

        for user in users {
            result.users_seen += 1;

            match self.sweep_user(&user, now) {
                Ok(Some(change)) if change.changed() => {
                    tracing::debug!(
                        user_id = %user.id,
                        from = change.before.current,
                        to = change.after.current,
                        "Streak reconciled"
                    );
                    result.updated += 1;
                }
                Ok(Some(_)) => result.unchanged += 1,
                Ok(None) => result.skipped += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Sweep failed for user");
                    result.errors.push((user.id.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            users = result.users_seen,
            updated = result.updated,
            unchanged = result.unchanged,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Daily sweep complete"
        );
        Ok(result)
    }

    fn sweep_user(&self, user: &User, now: DateTime<Utc>) -> Result<Option<StreakChange>> {
        let mut activity = self.db.activity_timestamps(&user.id)?;
        if self.config.streak.count_logins {
            activity.extend(user.last_login_at);
        }

        let boundary = self.boundary();
        let days: Vec<_> = activity
            .into_iter()
            .filter(|t| *t <= now)
            .map(|t| boundary.calendar_day(t))
            .collect();

        if days.is_empty() {
            return Ok(None);
        }

        self.db
            .update_streak(&user.id, |s| streak::replay_activity(s, days))
            .map(Some)
    }

    /// Statistics and productivity score over the configured window ending at `now`.
    pub fn user_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserStats> {
        let user = self.db.find_user(user_id)?;
        let window_start = now - Duration::days(self.config.stats.window_days);
        let records = self.db.session_records(&user.id, window_start, now)?;

        let stats = match self.boundary() {
            DayBoundary::Utc => {
                StudyStats::compute(&records, &now, &self.config.stats, &self.scorer)
            }
            DayBoundary::Local => StudyStats::compute(
                &records,
                &now.with_timezone(&Local),
                &self.config.stats,
                &self.scorer,
            ),
        };

        let today = self.boundary().calendar_day(now);
        Ok(UserStats {
            streak_status: user.streak.status(today),
            display_streak: user.streak.display_current(today),
            window_start,
            stats,
            user,
        })
    }

    /// Store a note for a user.
    pub fn add_note(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Note> {
        let user = self.db.find_user(user_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("note title must not be empty".to_string()));
        }

        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id,
            title: title.to_string(),
            body: body.to_string(),
            subject: subject.map(str::trim).filter(|s| !s.is_empty()).map(String::from),
            created_at: now,
        };
        self.db.insert_note(&note)?;
        Ok(note)
    }
}
