//! Analytics module for studytrack
//!
//! - [`streak`]: consecutive-day streak tracking
//! - [`productivity`]: bounded productivity score over a session window
//! - [`stats`]: per-user study statistics
//! - [`overview`]: admin aggregates across all users
//!
//! `streak` and `productivity` are pure functions over explicit inputs and
//! take the current time as a parameter.

pub mod overview;
pub mod productivity;
pub mod stats;
pub mod streak;

pub use overview::{generate_overview, AdminOverview, OverviewOptions, StreakLeader};
pub use productivity::{ProductivityScorer, ScoreBreakdown, ScoringWeights};
pub use stats::{DifficultyMix, StudyStats, SubjectTotal};
pub use streak::{
    classify_gap, record_activity, record_activity_on, replay_activity, DayGap, StreakStatus,
};
