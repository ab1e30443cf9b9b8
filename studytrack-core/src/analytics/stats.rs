//! Per-user study statistics for a window of sessions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use super::productivity::{ProductivityScorer, ScoreBreakdown};
use crate::config::StatsConfig;
use crate::types::{Difficulty, SessionRecord};

/// Time spent on one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectTotal {
    pub subject: String,
    pub sessions: usize,
    pub minutes: u64,
}

/// Session counts by difficulty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyMix {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyMix {
    fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }
}

/// Aggregate statistics over a caller-supplied window of sessions.
#[derive(Debug, Clone, Serialize)]
pub struct StudyStats {
    pub total_sessions: usize,
    pub total_minutes: u64,
    pub average_minutes: f64,
    /// Subjects ordered by minutes descending
    pub subjects: Vec<SubjectTotal>,
    pub difficulty: DifficultyMix,
    /// Minutes per day for the last `heatmap_days` days, oldest first
    pub daily_minutes: Vec<(NaiveDate, u64)>,
    pub productivity: ScoreBreakdown,
}

impl StudyStats {
    /// Compute statistics as of `now`. Calendar days are taken in `now`'s timezone.
    pub fn compute<Tz: TimeZone>(
        sessions: &[SessionRecord],
        now: &DateTime<Tz>,
        config: &StatsConfig,
        scorer: &ProductivityScorer,
    ) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();

        let total_sessions = sessions.len();
        let total_minutes: u64 = sessions
            .iter()
            .map(|s| u64::from(s.time_spent_minutes))
            .sum();
        let average_minutes = if total_sessions == 0 {
            0.0
        } else {
            total_minutes as f64 / total_sessions as f64
        };

        let mut by_subject: HashMap<&str, (usize, u64)> = HashMap::new();
        let mut difficulty = DifficultyMix::default();
        let mut by_day: HashMap<NaiveDate, u64> = HashMap::new();

        for s in sessions {
            let entry = by_subject.entry(s.subject.as_str()).or_default();
            entry.0 += 1;
            entry.1 += u64::from(s.time_spent_minutes);

            difficulty.add(s.difficulty);

            let day = s.date.with_timezone(&tz).date_naive();
            *by_day.entry(day).or_default() += u64::from(s.time_spent_minutes);
        }

        let mut subjects: Vec<SubjectTotal> = by_subject
            .into_iter()
            .map(|(subject, (count, minutes))| SubjectTotal {
                subject: subject.to_string(),
                sessions: count,
                minutes,
            })
            .collect();
        subjects.sort_by(|a, b| {
            b.minutes
                .cmp(&a.minutes)
                .then_with(|| a.subject.cmp(&b.subject))
        });
        subjects.truncate(config.top_subjects);

        let daily_minutes = (0..config.heatmap_days as i64)
            .rev()
            .map(|ago| {
                let day = today - Duration::days(ago);
                (day, by_day.get(&day).copied().unwrap_or(0))
            })
            .collect();

        let productivity = scorer.breakdown(sessions, now.with_timezone(&Utc));

        Self {
            total_sessions,
            total_minutes,
            average_minutes,
            subjects,
            difficulty,
            daily_minutes,
            productivity,
        }
    }

    /// Number of days in the heatmap with any study time.
    pub fn active_days(&self) -> usize {
        self.daily_minutes.iter().filter(|(_, m)| *m > 0).count()
    }

    /// Format total time for display (e.g., "12h 5m").
    pub fn duration_display(&self) -> String {
        let hours = self.total_minutes / 60;
        let mins = self.total_minutes % 60;
        if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}m", mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap()
    }

    fn session(subject: &str, minutes: u32, difficulty: Difficulty, days_ago: i64) -> SessionRecord {
        SessionRecord {
            subject: subject.to_string(),
            time_spent_minutes: minutes,
            difficulty,
            date: now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_empty_window() {
        let stats = StudyStats::compute(
            &[],
            &now(),
            &StatsConfig::default(),
            &ProductivityScorer::default(),
        );
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_minutes, 0.0);
        assert_eq!(stats.productivity.score, 5);
        assert_eq!(stats.daily_minutes.len(), 7);
        assert_eq!(stats.active_days(), 0);
    }

    #[test]
    fn test_aggregates() {
        let sessions = vec![
            session("math", 30, Difficulty::Hard, 0),
            session("math", 45, Difficulty::Medium, 1),
            session("art", 90, Difficulty::Easy, 1),
            session("bio", 20, Difficulty::Hard, 12),
        ];
        let stats = StudyStats::compute(
            &sessions,
            &now(),
            &StatsConfig::default(),
            &ProductivityScorer::default(),
        );

        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.total_minutes, 185);
        assert_eq!(stats.duration_display(), "3h 5m");
        assert_eq!(
            stats.difficulty,
            DifficultyMix {
                easy: 1,
                medium: 1,
                hard: 2
            }
        );

        let names: Vec<&str> = stats.subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["art", "math", "bio"]);
        assert_eq!(stats.subjects[1].sessions, 2);

        let today = now().date_naive();
        assert_eq!(stats.daily_minutes.last(), Some(&(today, 30)));
        assert_eq!(stats.daily_minutes[5], (today - Duration::days(1), 135));
        assert_eq!(stats.active_days(), 2);
    }

    #[test]
    fn test_top_subjects_truncated() {
        let sessions: Vec<SessionRecord> = ["a", "b", "c"]
            .iter()
            .map(|s| session(s, 10, Difficulty::Easy, 0))
            .collect();
        let config = StatsConfig {
            top_subjects: 2,
            ..Default::default()
        };
        let stats = StudyStats::compute(&sessions, &now(), &config, &ProductivityScorer::default());
        assert_eq!(stats.subjects.len(), 2);
        // Scoring still sees every subject
        assert_eq!(stats.productivity.unique_subjects, 3);
    }
}
