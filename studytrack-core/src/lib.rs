//! # studytrack-core
//!
//! Core library for studytrack - a study session tracker.
//!
//! This library provides:
//! - Domain types for users, study sessions and notes
//! - Streak tracking and productivity scoring
//! - Per-user statistics and admin overviews
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use studytrack_core::{ActivityRecorder, Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let recorder = ActivityRecorder::new(&db, &config);
//! let result = recorder
//!     .run_daily_sweep(chrono::Utc::now())
//!     .expect("sweep failed");
//! println!("{} streaks updated", result.updated);
//! ```

// Re-export commonly used items at the crate root
pub use activity::{ActivityRecorder, SweepResult, UserStats};
pub use config::Config;
pub use db::{Database, SessionFilter};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod activity;
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
