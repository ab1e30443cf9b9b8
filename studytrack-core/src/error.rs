//! Error types for studytrack-core

use thiserror::Error;

/// Main error type for the studytrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected at the boundary before reaching the analytics core
    #[error("invalid input: {0}")]
    Validation(String),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Note not found
    #[error("note not found: {0}")]
    NoteNotFound(String),

    /// A user with this email already exists
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// The connection mutex was poisoned by a panicking holder
    #[error("database lock poisoned")]
    Lock,
}

/// Result type alias for studytrack-core
pub type Result<T> = std::result::Result<T, Error>;
