//! Integration tests for studytrack-core
//!
//! These exercise the trigger points end to end against a file-backed
//! SQLite database in a temporary directory.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use studytrack_core::analytics::{generate_overview, OverviewOptions, StreakStatus};
use studytrack_core::config::StreakConfig;
use studytrack_core::{
    ActivityRecorder, Config, Database, Difficulty, Error, NewSession, Role, StreakState, User,
};
use tempfile::TempDir;

struct TestEnv {
    _dir: TempDir,
    db: Database,
    config: Config,
}

impl TestEnv {
    fn new() -> Self {
        studytrack_core::logging::init_test();
        let dir = TempDir::new().expect("failed to create temp dir");
        let db = Database::open(&dir.path().join("data.db")).expect("failed to open database");
        db.migrate().expect("failed to migrate");
        Self {
            _dir: dir,
            db,
            config: Config::default(),
        }
    }

    fn recorder(&self) -> ActivityRecorder<'_> {
        ActivityRecorder::new(&self.db, &self.config)
    }

    fn user(&self, name: &str) -> User {
        let user = User::new(name, format!("{}@example.com", name.to_lowercase()), Role::Student);
        self.db.insert_user(&user).expect("failed to insert user");
        user
    }

    fn streak(&self, user: &User) -> StreakState {
        self.db.get_user(&user.id).unwrap().unwrap().streak
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn study(subject: &str, minutes: i64, date: DateTime<Utc>) -> NewSession {
    NewSession {
        subject: subject.to_string(),
        time_spent_minutes: minutes,
        difficulty: Difficulty::Medium,
        date: Some(date),
        notes: None,
    }
}

// ============================================
// Session logging
// ============================================

#[test]
fn test_logging_sessions_builds_streak() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    rec.log_session(&user.id, study("math", 30, at(1, 9)), at(1, 10))
        .unwrap();
    rec.log_session(&user.id, study("math", 30, at(1, 20)), at(1, 21))
        .unwrap();
    let (_, change) = rec
        .log_session(&user.id, study("art", 40, at(2, 9)), at(2, 10))
        .unwrap();

    assert_eq!(
        change.after,
        StreakState {
            current: 2,
            longest: 2,
            last_active: Some(d(2)),
        }
    );

    // Missing the 3rd and 4th resets on the 5th
    let (_, change) = rec
        .log_session(&user.id, study("art", 40, at(5, 9)), at(5, 10))
        .unwrap();
    assert_eq!(change.after.current, 1);
    assert_eq!(change.after.longest, 2);
}

#[test]
fn test_backdated_session_is_stored_but_streak_unchanged() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    rec.log_session(&user.id, study("math", 30, at(10, 9)), at(10, 9))
        .unwrap();
    let (session, change) = rec
        .log_session(&user.id, study("math", 30, at(4, 9)), at(10, 12))
        .unwrap();

    assert!(!change.changed());
    assert_eq!(env.streak(&user).last_active, Some(d(10)));
    assert_eq!(env.db.activity_timestamps(&user.id).unwrap()[0], session.record.date);
}

#[test]
fn test_invalid_session_rejected_before_storage() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    let err = rec
        .log_session(&user.id, study("math", 0, at(1, 9)), at(1, 10))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(env.db.activity_timestamps(&user.id).unwrap().is_empty());
    assert_eq!(env.streak(&user), StreakState::default());

    let err = rec
        .log_session("no-such-user", study("math", 30, at(1, 9)), at(1, 10))
        .unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));
}

// ============================================
// Login
// ============================================

#[test]
fn test_login_counts_and_is_idempotent_per_day() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    rec.record_login(&user.id, at(1, 8)).unwrap();
    let again = rec.record_login(&user.id, at(1, 23)).unwrap();
    assert!(!again.changed());

    rec.record_login(&user.id, at(2, 8)).unwrap();
    let stored = env.db.get_user(&user.id).unwrap().unwrap();
    assert_eq!(stored.streak.current, 2);
    assert_eq!(stored.last_login_at, Some(at(2, 8)));
}

#[test]
fn test_login_ignored_when_disabled() {
    let mut env = TestEnv::new();
    env.config.streak = StreakConfig {
        count_logins: false,
        ..Default::default()
    };
    let user = env.user("Ada");

    let change = env.recorder().record_login(&user.id, at(1, 8)).unwrap();
    assert!(!change.changed());
    assert_eq!(env.streak(&user), StreakState::default());
}

// ============================================
// Daily sweep
// ============================================

#[test]
fn test_sweep_repairs_missed_updates_and_skips_idle_users() {
    let env = TestEnv::new();
    let active = env.user("Ada");
    let idle = env.user("Bob");

    // Sessions written without going through the recorder
    for day in [1, 2, 3] {
        let session = studytrack_core::StudySession {
            id: format!("s{}", day),
            user_id: active.id.clone(),
            record: studytrack_core::SessionRecord {
                subject: "math".to_string(),
                time_spent_minutes: 30,
                difficulty: Difficulty::Easy,
                date: at(day, 9),
            },
            notes: None,
            created_at: at(day, 9),
        };
        env.db.insert_session(&session).unwrap();
    }

    let rec = env.recorder();
    let result = rec.run_daily_sweep(at(3, 23)).unwrap();
    assert_eq!(result.users_seen, 2);
    assert_eq!(result.updated, 1);
    assert_eq!(result.skipped, 1);
    assert!(result.errors.is_empty());

    assert_eq!(
        env.streak(&active),
        StreakState {
            current: 3,
            longest: 3,
            last_active: Some(d(3)),
        }
    );
    assert_eq!(env.streak(&idle), StreakState::default());

    // Running again the same day changes nothing
    let again = rec.run_daily_sweep(at(3, 23)).unwrap();
    assert_eq!(again.updated, 0);
    assert_eq!(again.unchanged, 1);
    assert_eq!(again.skipped, 1);
}

#[test]
fn test_sweep_does_not_continue_streak_over_missed_day() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    for day in [1, 2, 3] {
        rec.log_session(&user.id, study("math", 30, at(day, 9)), at(day, 9))
            .unwrap();
    }
    // Day 4 missed; day 5 session stored directly
    env.db
        .insert_session(&studytrack_core::StudySession {
            id: "late".to_string(),
            user_id: user.id.clone(),
            record: studytrack_core::SessionRecord {
                subject: "math".to_string(),
                time_spent_minutes: 30,
                difficulty: Difficulty::Hard,
                date: at(5, 9),
            },
            notes: None,
            created_at: at(5, 9),
        })
        .unwrap();

    rec.run_daily_sweep(at(5, 23)).unwrap();
    let streak = env.streak(&user);
    assert_eq!(streak.current, 1);
    assert_eq!(streak.longest, 3);
}

// ============================================
// Concurrency at the persistence layer
// ============================================

#[test]
fn test_concurrent_streak_updates_are_not_lost() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let base = d(1);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..5 {
                    env.db
                        .update_streak(&user.id, |s| {
                            let current = s.current + 1;
                            StreakState {
                                current,
                                longest: s.longest.max(current),
                                last_active: Some(base),
                            }
                        })
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(env.streak(&user).current, 40);
}

// ============================================
// Statistics and overview
// ============================================

#[test]
fn test_user_stats_window_and_score() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    let subjects = ["math", "physics", "history", "math", "physics"];
    for (i, subject) in subjects.iter().enumerate() {
        let when = at(10, 8) + Duration::days(i as i64);
        rec.log_session(&user.id, study(subject, 30, when), when).unwrap();
    }
    // Outside the 30-day window
    rec.log_session(&user.id, study("art", 200, at(1, 8) - Duration::days(40)), at(1, 8))
        .unwrap();

    let now = at(14, 20);
    let stats = rec.user_stats("ada@example.com", now).unwrap();
    assert_eq!(stats.stats.total_sessions, 5);
    assert_eq!(stats.stats.total_minutes, 150);
    assert_eq!(stats.stats.productivity.score, 10);
    assert_eq!(stats.streak_status, StreakStatus::Active);
    assert_eq!(stats.display_streak, 5);

    // Four days later the streak reads as broken, stored counters untouched
    let later = rec.user_stats(&user.id, now + Duration::days(4)).unwrap();
    assert_eq!(later.streak_status, StreakStatus::Broken);
    assert_eq!(later.display_streak, 0);
    assert_eq!(later.user.streak.current, 5);
}

#[test]
fn test_admin_overview() {
    let env = TestEnv::new();
    let ada = env.user("Ada");
    let bob = env.user("Bob");
    env.user("Cy");
    let rec = env.recorder();

    for day in [1, 2, 3] {
        rec.log_session(&ada.id, study("math", 30, at(day, 9)), at(day, 9))
            .unwrap();
    }
    rec.log_session(&bob.id, study("art", 120, at(3, 9)), at(3, 9))
        .unwrap();

    let overview = generate_overview(&env.db, at(3, 20), &OverviewOptions::default()).unwrap();
    assert_eq!(overview.total_users, 3);
    assert_eq!(overview.total_sessions, 4);
    assert_eq!(overview.total_minutes, 210);
    assert_eq!(overview.active_users, 2);
    assert_eq!(overview.top_subjects[0].subject, "art");

    let leaders: Vec<(&str, u32)> = overview
        .streak_leaders
        .iter()
        .map(|l| (l.name.as_str(), l.current))
        .collect();
    assert_eq!(leaders, vec![("Ada", 3), ("Bob", 1)]);
}

#[test]
fn test_notes_through_recorder() {
    let env = TestEnv::new();
    let user = env.user("Ada");
    let rec = env.recorder();

    let note = rec
        .add_note(&user.email, "Limits", "epsilon-delta", Some(" math "), at(1, 9))
        .unwrap();
    assert_eq!(note.subject.as_deref(), Some("math"));
    assert_eq!(env.db.list_notes(&user.id).unwrap().len(), 1);

    let err = rec.add_note(&user.id, "  ", "", None, at(1, 9)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
