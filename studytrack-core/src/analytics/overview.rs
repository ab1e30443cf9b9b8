//! Admin overview across all users.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::stats::SubjectTotal;
use crate::config::DayBoundary;
use crate::db::repo::OverviewTotals;
use crate::Database;

/// One row of the streak leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakLeader {
    pub user_id: String,
    pub name: String,
    /// Streak as of today (0 once broken)
    pub current: u32,
    pub longest: u32,
}

/// Aggregate analytics for administrators.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
    pub generated_at: DateTime<Utc>,
    /// Window used for the "recent" and "active" counts
    pub recent_days: i64,
    pub total_users: i64,
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub recent_sessions: i64,
    pub active_users: i64,
    pub top_subjects: Vec<SubjectTotal>,
    pub streak_leaders: Vec<StreakLeader>,
}

/// Options for [`generate_overview`].
#[derive(Debug, Clone)]
pub struct OverviewOptions {
    pub recent_days: i64,
    pub limit: usize,
    pub day_boundary: DayBoundary,
}

impl Default for OverviewOptions {
    fn default() -> Self {
        Self {
            recent_days: 7,
            limit: 5,
            day_boundary: DayBoundary::Utc,
        }
    }
}

/// Generate the admin overview as of `now`.
pub fn generate_overview(
    db: &Database,
    now: DateTime<Utc>,
    options: &OverviewOptions,
) -> crate::Result<AdminOverview> {
    let since = now - Duration::days(options.recent_days);
    let OverviewTotals {
        users,
        sessions,
        minutes,
        recent_sessions,
        active_users,
    } = db.get_overview_totals(since)?;

    let top_subjects = db.get_top_subjects(options.limit)?;

    let today = options.day_boundary.calendar_day(now);
    let mut streak_leaders: Vec<StreakLeader> = db
        .list_users()?
        .into_iter()
        .map(|u| StreakLeader {
            current: u.streak.display_current(today),
            longest: u.streak.longest,
            user_id: u.id,
            name: u.name,
        })
        .filter(|l| l.longest > 0)
        .collect();
    streak_leaders.sort_by(|a, b| {
        b.current
            .cmp(&a.current)
            .then_with(|| b.longest.cmp(&a.longest))
            .then_with(|| a.name.cmp(&b.name))
    });
    streak_leaders.truncate(options.limit);

    Ok(AdminOverview {
        generated_at: now,
        recent_days: options.recent_days,
        total_users: users,
        total_sessions: sessions,
        total_minutes: minutes,
        recent_sessions,
        active_users,
        top_subjects,
        streak_leaders,
    })
}
