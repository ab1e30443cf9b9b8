//! Database layer for studytrack
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for users, sessions and notes
//! - Atomic per-user streak updates

pub mod repo;
pub mod schema;

pub use repo::{Database, OverviewTotals, SessionFilter, StreakChange};
