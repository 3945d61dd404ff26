//! Error types for multitimer-core.
//!
//! Every fallible operation returns a typed error from this module. The
//! library never retries internally: errors are propagated to the caller,
//! which decides whether to retry, log, or surface them to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for multitimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("alarm error: {0}")]
    Alarm(#[from] AlarmError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Timer store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot prepare data directory: {0}")]
    DataDir(#[from] std::io::Error),

    #[error("failed to open timer store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store migration failed: {0}")]
    MigrationFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("timer store is locked")]
    Locked,

    #[error("no timer with id {0}")]
    NotFound(i64),

    #[error("invalid timer: {0}")]
    InvalidTimer(#[from] InvalidRecord),
}

/// A malformed timer record.
///
/// The store rejects these outright on create and update; the alarm
/// scheduler skips them with a warning rather than failing a whole
/// recompute over one bad row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("timer name is empty")]
    EmptyName,

    #[error("duration must be positive, got {duration_ms} ms")]
    NonPositiveDuration { duration_ms: i64 },

    #[error("duration {duration_ms} ms exceeds the supported maximum")]
    DurationTooLong { duration_ms: i64 },

    #[error("remaining time is negative: {remaining_ms} ms")]
    NegativeRemaining { remaining_ms: i64 },

    #[error("remaining time {remaining_ms} ms exceeds duration {duration_ms} ms")]
    RemainingExceedsDuration { remaining_ms: i64, duration_ms: i64 },

    #[error("timer is running but has no start anchor")]
    RunningWithoutAnchor,
}

/// Errors from an alarm recompute.
///
/// Neither variant is fatal: the safe degraded state is "no wake-up
/// armed", and the next timer mutation recomputes from scratch.
#[derive(Error, Debug)]
pub enum AlarmError {
    /// The timer snapshot could not be read. No wake-service call was
    /// made, so whatever was armed before is still armed.
    #[error("timer store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The wake-service rejected the arm or cancel request.
    #[error("wake-up scheduling denied: {0}")]
    SchedulingDenied(#[from] WakeError),
}

/// Errors from a wake-service implementation.
#[derive(Error, Debug)]
pub enum WakeError {
    #[error("wake-service request rejected: {0}")]
    Denied(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("cannot parse '{value}' for key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias using [`CoreError`] as the default error.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
