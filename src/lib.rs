//! meetgreet - A local event tracker for fans attending meet-and-greet events.
//!
//! This library provides the core functionality for the `mg` CLI tool:
//! - an entity store with parent/child integrity ([`storage`])
//! - a rehearsal playback engine for practice scripts ([`rehearsal`])
//! - read-only rollups over expenses and schedules ([`aggregate`])

pub mod action_log;
pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod rehearsal;
pub mod storage;


/// Library-level error type for meetgreet operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Not initialized: run `mg init` first")]
    NotInitialized,

    /// An operation referenced an id that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A relationship rule could not be upheld; the operation was rolled back.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The narration collaborator failed mid-utterance.
    #[error("Narration failed: {0}")]
    NarrationFailure(String),

    /// A caller-supplied value is outside its domain.
    #[error("Invalid value: {0}")]
    InvalidFieldValue(String),

    /// A command is not valid in the current rehearsal state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation(message.unwrap_or_else(|| code.to_string()))
            }
            other => Error::Database(other),
        }
    }
}

/// Result type alias for meetgreet operations.
pub type Result<T> = std::result::Result<T, Error>;
