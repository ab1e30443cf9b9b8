//! Terminal and JSON rendering for CLI results.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use studytrack_core::analytics::AdminOverview;
use studytrack_core::db::repo::StreakChange;
use studytrack_core::{Config, Note, StudySession, SweepResult, User, UserStats};

fn plural(n: impl Into<u64>) -> &'static str {
    if n.into() == 1 {
        ""
    } else {
        "s"
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn user(user: &User, now: DateTime<Utc>, config: &Config, json: bool) -> Result<()> {
    users(std::slice::from_ref(user), now, config, json)
}

pub fn users(users: &[User], now: DateTime<Utc>, config: &Config, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::to_value(users)?);
    }

    if users.is_empty() {
        println!("No users yet. Add one with 'studytrack user add'.");
        return Ok(());
    }

    let today = config.streak.day_boundary.calendar_day(now);
    for u in users {
        let status = u.streak.status(today);
        println!(
            "{}  {:<20} {:<28} {:<7}  streak {} ({}), best {}",
            u.id,
            u.name,
            u.email,
            u.role.as_str(),
            u.streak.display_current(today),
            status.as_str(),
            u.streak.longest
        );
    }
    Ok(())
}

pub fn streak_change(user: &User, change: &StreakChange, json: bool) -> Result<()> {
    if json {
        return print_json(&json!({
            "user_id": user.id,
            "changed": change.changed(),
            "before": change.before,
            "after": change.after,
        }));
    }

    let after = change.after;
    if change.changed() {
        println!(
            "{}: streak {} day{} (best {})",
            user.name,
            after.current,
            plural(after.current),
            after.longest
        );
    } else {
        println!(
            "{}: streak unchanged at {} day{}",
            user.name,
            after.current,
            plural(after.current)
        );
    }
    Ok(())
}

pub fn session_logged(
    user: &User,
    session: &StudySession,
    change: &StreakChange,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&json!({
            "session": session,
            "streak": change.after,
            "streak_changed": change.changed(),
        }));
    }

    println!(
        "Logged {} min of {} ({}) for {}",
        session.record.time_spent_minutes,
        session.record.subject,
        session.record.difficulty,
        user.name
    );
    streak_change(user, change, false)
}

pub fn sweep(result: &SweepResult, json: bool) -> Result<()> {
    if json {
        return print_json(&json!({
            "users_seen": result.users_seen,
            "updated": result.updated,
            "unchanged": result.unchanged,
            "skipped": result.skipped,
            "errors": result
                .errors
                .iter()
                .map(|(id, msg)| json!({ "user_id": id, "error": msg }))
                .collect::<Vec<_>>(),
        }));
    }

    println!(
        "Swept {} user{}: {} updated, {} unchanged, {} without activity",
        result.users_seen,
        plural(result.users_seen as u64),
        result.updated,
        result.unchanged,
        result.skipped
    );
    for (id, msg) in &result.errors {
        eprintln!("  {}: {}", id, msg);
    }
    Ok(())
}

pub fn stats(stats: &UserStats, json: bool) -> Result<()> {
    if json {
        return print_json(&json!({
            "user_id": stats.user.id,
            "window_start": stats.window_start,
            "streak": {
                "current": stats.display_streak,
                "longest": stats.user.streak.longest,
                "status": stats.streak_status.as_str(),
                "last_active": stats.user.streak.last_active,
            },
            "stats": stats.stats,
        }));
    }

    let s = &stats.stats;
    let p = &s.productivity;

    println!();
    println!("{} since {}", stats.user.name, stats.window_start.format("%Y-%m-%d"));
    println!();

    println!("SUMMARY");
    println!(
        "   Sessions: {:<10} Total time: {}",
        s.total_sessions,
        s.duration_display()
    );
    println!("   Average:  {:.0} min", s.average_minutes);
    println!(
        "   Difficulty: {} easy, {} medium, {} hard",
        s.difficulty.easy, s.difficulty.medium, s.difficulty.hard
    );
    println!();

    println!("STREAK");
    println!(
        "   Current:  {} day{} ({})",
        stats.display_streak,
        plural(stats.display_streak),
        stats.streak_status.as_str()
    );
    println!(
        "   Longest:  {} day{}",
        stats.user.streak.longest,
        plural(stats.user.streak.longest)
    );
    println!();

    println!("PRODUCTIVITY  {}/10", p.score);
    println!(
        "   Consistency: +{:.1}  ({} session{} in the last week)",
        p.consistency_bonus,
        p.recent_sessions,
        plural(p.recent_sessions as u64)
    );
    println!(
        "   Length:      +{:.1}  ({} of {} in the optimal range)",
        p.length_bonus, p.optimal_sessions, p.total_sessions
    );
    println!(
        "   Variety:     +{:.1}  ({} subject{})",
        p.variety_bonus,
        p.unique_subjects,
        plural(p.unique_subjects as u64)
    );
    println!();

    if !s.subjects.is_empty() {
        println!("TOP SUBJECTS");
        for (i, subject) in s.subjects.iter().enumerate() {
            println!(
                "   {}. {:<20} {:>5} min  ({} session{})",
                i + 1,
                subject.subject,
                subject.minutes,
                subject.sessions,
                plural(subject.sessions as u64)
            );
        }
        println!();
    }

    println!("LAST {} DAYS", s.daily_minutes.len());
    for (day, minutes) in &s.daily_minutes {
        let bar = "#".repeat(((*minutes + 9) / 10).min(30) as usize);
        println!("   {}  {:>4}  {}", day.format("%a %d"), minutes, bar);
    }
    println!();
    Ok(())
}

pub fn overview(overview: &AdminOverview, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::to_value(overview)?);
    }

    println!();
    println!("OVERVIEW");
    println!(
        "   Users:    {:<10} Active (last {} days): {}",
        overview.total_users, overview.recent_days, overview.active_users
    );
    println!(
        "   Sessions: {:<10} Recent: {}",
        overview.total_sessions, overview.recent_sessions
    );
    println!("   Minutes:  {}", overview.total_minutes);
    println!();

    if !overview.top_subjects.is_empty() {
        println!("TOP SUBJECTS");
        for (i, subject) in overview.top_subjects.iter().enumerate() {
            println!(
                "   {}. {:<20} {:>6} min",
                i + 1,
                subject.subject,
                subject.minutes
            );
        }
        println!();
    }

    if !overview.streak_leaders.is_empty() {
        println!("STREAKS");
        for leader in &overview.streak_leaders {
            println!(
                "   {:<20} {:>3} current  {:>3} best",
                leader.name, leader.current, leader.longest
            );
        }
        println!();
    }
    Ok(())
}

pub fn notes(notes: &[Note], json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::to_value(notes)?);
    }

    if notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }
    for note in notes {
        let subject = note
            .subject
            .as_deref()
            .map(|s| format!(" [{}]", s))
            .unwrap_or_default();
        println!(
            "{}  {}  {}{}",
            note.id,
            note.created_at.format("%Y-%m-%d"),
            note.title,
            subject
        );
        if !note.body.is_empty() {
            println!("    {}", note.body);
        }
    }
    Ok(())
}
