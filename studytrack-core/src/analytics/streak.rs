//! Consecutive-day streak tracking.
//!
//! A single implementation shared by every trigger point (login, session
//! logging, daily sweep). All functions here are pure: the caller supplies
//! the current state and the time, and persists the returned state.
//!
//! Comparison is by calendar date, never by instant. Use the timezone of the
//! `DateTime` you pass in to choose where the day boundary falls.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::types::StreakState;

/// How a new activity date relates to the last recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayGap {
    /// No previous activity
    First,
    /// Already recorded today
    SameDay,
    /// Exactly one day after the last activity
    NextDay,
    /// More than one day since the last activity
    Broken(i64),
    /// Earlier than the last activity (clock skew or a backdated event)
    Backdated(i64),
}

/// Classify the day gap between `last_active` and `today`.
pub fn classify_gap(last_active: Option<NaiveDate>, today: NaiveDate) -> DayGap {
    let Some(last) = last_active else {
        return DayGap::First;
    };
    match (today - last).num_days() {
        0 => DayGap::SameDay,
        1 => DayGap::NextDay,
        n if n > 1 => DayGap::Broken(n),
        n => DayGap::Backdated(n),
    }
}

/// Apply one qualifying activity on `today` and return the updated state.
///
/// Never fails. A backdated activity leaves both the counters and
/// `last_active` untouched. Moving `last_active` back to the older date would
/// make the next on-time event see a false multi-day gap and reset the streak.
pub fn record_activity_on(state: &StreakState, today: NaiveDate) -> StreakState {
    let gap = classify_gap(state.last_active, today);

    let current = match gap {
        DayGap::First => 1,
        DayGap::SameDay | DayGap::Backdated(_) => state.current,
        DayGap::NextDay => state.current.saturating_add(1),
        DayGap::Broken(_) => 1,
    };

    let last_active = match (gap, state.last_active) {
        (DayGap::Backdated(_), last) => last,
        _ => Some(today),
    };

    let next = StreakState {
        current,
        longest: state.longest.max(current),
        last_active,
    };

    tracing::debug!(
        ?gap,
        from = state.current,
        to = next.current,
        longest = next.longest,
        %today,
        "Streak updated"
    );

    next
}

/// Apply one qualifying activity at `now`, using the calendar date of `now`
/// in its own timezone.
pub fn record_activity<Tz: TimeZone>(state: &StreakState, now: &DateTime<Tz>) -> StreakState {
    record_activity_on(state, now.date_naive())
}

/// Fold a user's activity history through [`record_activity_on`], oldest first.
///
/// Used by the daily sweep to reconcile a persisted state against the
/// activity actually stored for that user. Dates at or before the state's
/// `last_active` are no-ops, so replaying the same history twice yields the
/// same state. An empty history returns the state unchanged.
pub fn replay_activity<I>(state: &StreakState, days: I) -> StreakState
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut days: Vec<NaiveDate> = days.into_iter().collect();
    days.sort_unstable();
    days.dedup();

    days.into_iter()
        .fold(*state, |acc, day| record_activity_on(&acc, day))
}

/// Read-only view of a streak relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStatus {
    /// Never active
    Inactive,
    /// Activity recorded today
    Active,
    /// Last active yesterday: one more activity today keeps the streak
    AtRisk,
    /// More than one day without activity; the next activity restarts at 1
    Broken,
}

impl StreakStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakStatus::Inactive => "inactive",
            StreakStatus::Active => "active",
            StreakStatus::AtRisk => "at risk",
            StreakStatus::Broken => "broken",
        }
    }
}

impl StreakState {
    /// Where this streak stands as of `today`. Does not modify the state.
    pub fn status(&self, today: NaiveDate) -> StreakStatus {
        match classify_gap(self.last_active, today) {
            DayGap::First => StreakStatus::Inactive,
            DayGap::SameDay | DayGap::Backdated(_) => StreakStatus::Active,
            DayGap::NextDay => StreakStatus::AtRisk,
            DayGap::Broken(_) => StreakStatus::Broken,
        }
    }

    /// The streak length a user would see today: `current`, or 0 once broken.
    pub fn display_current(&self, today: NaiveDate) -> u32 {
        match self.status(today) {
            StreakStatus::Active | StreakStatus::AtRisk => self.current,
            StreakStatus::Inactive | StreakStatus::Broken => 0,
        }
    }
}
