//! Core domain types for studytrack
//!
//! | Term | Definition |
//! |------|------------|
//! | **User** | A learner (or administrator) who logs study activity |
//! | **Study session** | One block of study time on a subject, logged by a user |
//! | **Streak** | Consecutive calendar days with at least one qualifying activity |
//! | **Qualifying activity** | An event that counts toward a streak (login, logged session) |
//! | **Note** | Free-text study note owned by a user |
//!
//! Streak state lives on the [`User`] record but is only ever changed through
//! [`crate::analytics::streak`]; the database layer just persists what it is given.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Streak
// ============================================

/// Per-user consecutive-day streak counters.
///
/// `longest >= current` holds after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Length of the active consecutive-day streak
    pub current: u32,
    /// Maximum `current` ever observed
    pub longest: u32,
    /// Calendar date of the most recent qualifying activity
    pub last_active: Option<NaiveDate>,
}

// ============================================
// Sessions
// ============================================

/// Perceived difficulty of a study session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("unknown difficulty: {}", s)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scoring-relevant view of a study session.
///
/// Values are assumed valid (`time_spent_minutes >= 1`); see [`NewSession`]
/// for the boundary that enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject: String,
    pub time_spent_minutes: u32,
    pub difficulty: Difficulty,
    pub date: DateTime<Utc>,
}

/// A persisted study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning user
    pub user_id: String,
    #[serde(flatten)]
    pub record: SessionRecord,
    /// Optional free-text notes attached when logging
    pub notes: Option<String>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

/// Unvalidated input for logging a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub subject: String,
    pub time_spent_minutes: i64,
    pub difficulty: Difficulty,
    /// When the session took place; defaults to the logging time
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewSession {
    /// Validate and convert into a [`SessionRecord`].
    pub fn into_record(self, now: DateTime<Utc>) -> Result<(SessionRecord, Option<String>)> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(Error::Validation("subject must not be empty".to_string()));
        }
        let minutes = u32::try_from(self.time_spent_minutes)
            .ok()
            .filter(|m| *m >= 1)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "time spent must be at least 1 minute, got {}",
                    self.time_spent_minutes
                ))
            })?;

        let date = self.date.unwrap_or(now);
        if date > now {
            return Err(Error::Validation(format!(
                "session date {} is in the future",
                date.to_rfc3339()
            )));
        }

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok((
            SessionRecord {
                subject: subject.to_string(),
                time_spent_minutes: minutes,
                difficulty: self.difficulty,
                date,
            },
            notes,
        ))
    }
}

// ============================================
// Users
// ============================================

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub streak: StreakState,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a fresh user with a generated ID and an empty streak.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            role,
            streak: StreakState::default(),
            created_at: Utc::now(),
            last_login_at: None,
        }
    }
}

// ============================================
// Notes
// ============================================

/// A free-text study note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_session(minutes: i64) -> NewSession {
        NewSession {
            subject: "  Algebra ".to_string(),
            time_spent_minutes: minutes,
            difficulty: Difficulty::Medium,
            date: None,
            notes: Some("   ".to_string()),
        }
    }

    #[test]
    fn test_difficulty_round_trip() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(d.as_str().parse::<Difficulty>().unwrap(), d);
        }
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_new_session_normalizes_input() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let (record, notes) = new_session(30).into_record(now).unwrap();
        assert_eq!(record.subject, "Algebra");
        assert_eq!(record.time_spent_minutes, 30);
        assert_eq!(record.date, now);
        assert!(notes.is_none());
    }

    #[test]
    fn test_new_session_rejects_bad_minutes() {
        let now = Utc::now();
        assert!(matches!(
            new_session(0).into_record(now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            new_session(-15).into_record(now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_new_session_rejects_future_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut input = new_session(30);
        input.date = Some(now + chrono::Duration::hours(1));
        assert!(matches!(input.into_record(now), Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_session_rejects_blank_subject() {
        let mut input = new_session(30);
        input.subject = " \t".to_string();
        assert!(matches!(
            input.into_record(Utc::now()),
            Err(Error::Validation(_))
        ));
    }
}
