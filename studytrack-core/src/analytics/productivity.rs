//! Productivity scoring over a window of study sessions.
//!
//! The score is a bounded integer summarizing three things:
//! - **Consistency:** enough sessions in the trailing week
//! - **Session length:** share of sessions in the optimal length band
//! - **Variety:** number of distinct subjects studied
//!
//! Every aggregation is a count or a distinct-set size, so the result does
//! not depend on the order sessions are supplied in.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SessionRecord;

/// Longest day window accepted from configuration (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Tunable constants for the productivity score.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Score returned when there are no sessions at all
    pub empty_score: u8,
    /// Starting point before bonuses
    pub base: f64,
    /// Length of the trailing consistency window (inclusive)
    pub consistency_window_days: i64,
    /// Sessions needed inside the window to earn the consistency bonus
    pub consistency_min_sessions: usize,
    pub consistency_bonus: f64,
    /// Optimal session length band, inclusive on both ends
    pub optimal_min_minutes: u32,
    pub optimal_max_minutes: u32,
    /// Multiplied by the fraction of sessions in the optimal band
    pub length_bonus: f64,
    /// Distinct subjects needed for the full variety bonus
    pub variety_target: usize,
    pub variety_bonus: f64,
    pub min_score: u8,
    pub max_score: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            empty_score: 5,
            base: 5.0,
            consistency_window_days: 7,
            consistency_min_sessions: 5,
            consistency_bonus: 2.0,
            optimal_min_minutes: 25,
            optimal_max_minutes: 50,
            length_bonus: 2.0,
            variety_target: 3,
            variety_bonus: 1.0,
            min_score: 1,
            max_score: 10,
        }
    }
}

impl ScoringWeights {
    /// Reject combinations that would make the score meaningless.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("base", self.base),
            ("consistency_bonus", self.consistency_bonus),
            ("length_bonus", self.length_bonus),
            ("variety_bonus", self.variety_bonus),
        ] {
            if !value.is_finite() {
                return Err(Error::Config(format!(
                    "scoring.{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        if self.optimal_min_minutes > self.optimal_max_minutes {
            return Err(Error::Config(format!(
                "scoring.optimal_min_minutes ({}) must not exceed scoring.optimal_max_minutes ({})",
                self.optimal_min_minutes, self.optimal_max_minutes
            )));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.consistency_window_days) {
            return Err(Error::Config(format!(
                "scoring.consistency_window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        if self.variety_target == 0 {
            return Err(Error::Config(
                "scoring.variety_target must be at least 1".to_string(),
            ));
        }
        if self.min_score > self.max_score {
            return Err(Error::Config(
                "scoring.min_score must not exceed scoring.max_score".to_string(),
            ));
        }
        Ok(())
    }
}

/// Each component of a computed score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Final clamped score
    pub score: u8,
    /// Sum of base and bonuses before rounding
    pub raw: f64,
    pub base: f64,
    pub consistency_bonus: f64,
    pub length_bonus: f64,
    pub variety_bonus: f64,
    /// Sessions inside the consistency window
    pub recent_sessions: usize,
    /// Sessions inside the optimal length band
    pub optimal_sessions: usize,
    pub unique_subjects: usize,
    pub total_sessions: usize,
}

/// Computes productivity scores with a fixed set of weights.
#[derive(Debug, Clone, Default)]
pub struct ProductivityScorer {
    weights: ScoringWeights,
}

impl ProductivityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score `sessions` as of `now`.
    pub fn score(&self, sessions: &[SessionRecord], now: DateTime<Utc>) -> u8 {
        self.breakdown(sessions, now).score
    }

    /// Score `sessions` as of `now`, keeping every component.
    pub fn breakdown(&self, sessions: &[SessionRecord], now: DateTime<Utc>) -> ScoreBreakdown {
        let w = &self.weights;

        if sessions.is_empty() {
            return ScoreBreakdown {
                score: w.empty_score,
                raw: w.empty_score as f64,
                base: w.base,
                consistency_bonus: 0.0,
                length_bonus: 0.0,
                variety_bonus: 0.0,
                recent_sessions: 0,
                optimal_sessions: 0,
                unique_subjects: 0,
                total_sessions: 0,
            };
        }

        let total = sessions.len();
        let window = Duration::days(w.consistency_window_days);

        // Future-dated sessions are outside a window that ends at `now`
        let recent_sessions = sessions
            .iter()
            .filter(|s| {
                let age = now - s.date;
                age >= Duration::zero() && age <= window
            })
            .count();
        let consistency_bonus = if recent_sessions >= w.consistency_min_sessions {
            w.consistency_bonus
        } else {
            0.0
        };

        let optimal_sessions = sessions
            .iter()
            .filter(|s| {
                (w.optimal_min_minutes..=w.optimal_max_minutes).contains(&s.time_spent_minutes)
            })
            .count();
        let length_bonus = (optimal_sessions as f64 / total as f64) * w.length_bonus;

        let unique_subjects = sessions
            .iter()
            .map(|s| s.subject.as_str())
            .collect::<HashSet<_>>()
            .len();
        let variety_bonus =
            (unique_subjects as f64 / w.variety_target as f64).min(1.0) * w.variety_bonus;

        let raw = w.base + consistency_bonus + length_bonus + variety_bonus;
        let score = raw
            .round()
            .clamp(w.min_score as f64, w.max_score as f64) as u8;

        ScoreBreakdown {
            score,
            raw,
            base: w.base,
            consistency_bonus,
            length_bonus,
            variety_bonus,
            recent_sessions,
            optimal_sessions,
            unique_subjects,
            total_sessions: total,
        }
    }
}

/// Score `sessions` as of `now` with the default weights.
pub fn score(sessions: &[SessionRecord], now: DateTime<Utc>) -> u8 {
    ProductivityScorer::default().score(sessions, now)
}
