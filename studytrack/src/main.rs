//! studytrack - study session tracker CLI
//!
//! Log study sessions, keep a daily streak, and see productivity statistics.

mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use studytrack_core::analytics::{generate_overview, OverviewOptions};
use studytrack_core::{ActivityRecorder, Config, Database, Difficulty, NewSession, Role, User};

#[derive(Parser, Debug)]
#[command(name = "studytrack")]
#[command(about = "Track study sessions, streaks and productivity")]
#[command(version)]
struct Args {
    /// Use this time instead of the system clock (RFC 3339 or YYYY-MM-DD)
    #[arg(long, global = true)]
    now: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Record a login for a user
    Login {
        /// User ID or email
        user: String,
    },

    /// Log a study session
    Log {
        /// User ID or email
        user: String,
        #[arg(long)]
        subject: String,
        /// Time spent in minutes
        #[arg(long)]
        minutes: i64,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        /// When the session happened (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Reconcile every user's streak against stored activity
    Sweep,

    /// Show statistics and productivity score for a user
    Stats {
        /// User ID or email
        user: String,
    },

    /// Show aggregate statistics across all users
    Overview,

    /// Manage study notes
    #[command(subcommand)]
    Note(NoteCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a new user
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Grant administrator role
        #[arg(long)]
        admin: bool,
    },
    /// List all users
    List,
    /// Show one user
    Show {
        /// User ID or email
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    /// Add a note
    Add {
        /// User ID or email
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// List a user's notes
    List {
        /// User ID or email
        user: String,
    },
    /// Delete a note by ID
    Delete { id: String },
}

/// Parse RFC 3339, or a bare date taken as midnight UTC.
fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid time '{}': use RFC 3339 or YYYY-MM-DD", value))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid date '{}'", value))?;
    Ok(midnight.and_utc())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = studytrack_core::logging::init(&config.logging).ok();

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let now = match &args.now {
        Some(value) => parse_time(value)?,
        None => Utc::now(),
    };
    let json = args.format == Format::Json;
    let recorder = ActivityRecorder::new(&db, &config);

    match args.command {
        Command::User(UserCommand::Add { name, email, admin }) => {
            let role = if admin { Role::Admin } else { Role::Student };
            let mut user = User::new(name.trim(), email.trim(), role);
            user.created_at = now;
            db.insert_user(&user).context("failed to add user")?;
            output::user(&user, now, &config, json)?;
        }
        Command::User(UserCommand::List) => {
            let users = db.list_users()?;
            output::users(&users, now, &config, json)?;
        }
        Command::User(UserCommand::Show { user }) => {
            let user = db.find_user(&user)?;
            output::user(&user, now, &config, json)?;
        }
        Command::Login { user } => {
            let user = db.find_user(&user)?;
            let change = recorder
                .record_login(&user.id, now)
                .context("failed to record login")?;
            output::streak_change(&user, &change, json)?;
        }
        Command::Log {
            user,
            subject,
            minutes,
            difficulty,
            date,
            notes,
        } => {
            let user = db.find_user(&user)?;
            let date = date.as_deref().map(parse_time).transpose()?;
            let input = NewSession {
                subject,
                time_spent_minutes: minutes,
                difficulty,
                date,
                notes,
            };
            let (session, change) = recorder
                .log_session(&user.id, input, now)
                .context("failed to log session")?;
            output::session_logged(&user, &session, &change, json)?;
        }
        Command::Sweep => {
            let result = recorder
                .run_daily_sweep(now)
                .context("daily sweep failed")?;
            output::sweep(&result, json)?;
        }
        Command::Stats { user } => {
            let stats = recorder
                .user_stats(&user, now)
                .context("failed to compute statistics")?;
            output::stats(&stats, json)?;
        }
        Command::Overview => {
            let options = OverviewOptions {
                limit: config.stats.top_subjects,
                day_boundary: config.streak.day_boundary,
                ..Default::default()
            };
            let overview =
                generate_overview(&db, now, &options).context("failed to build overview")?;
            output::overview(&overview, json)?;
        }
        Command::Note(NoteCommand::Add {
            user,
            title,
            body,
            subject,
        }) => {
            let note = recorder.add_note(&user, &title, &body, subject.as_deref(), now)?;
            output::notes(std::slice::from_ref(&note), json)?;
        }
        Command::Note(NoteCommand::List { user }) => {
            let user = db.find_user(&user)?;
            let notes = db.list_notes(&user.id)?;
            output::notes(&notes, json)?;
        }
        Command::Note(NoteCommand::Delete { id }) => {
            db.delete_note(&id)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Deleted note {}", id);
            }
        }
    }

    Ok(())
}
