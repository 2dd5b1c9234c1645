//! Core error types for breathit-core.
//!
//! The clock itself never fails; these errors cover the collaborators
//! around it (configuration, history storage, observers) and input
//! validation at session construction.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Data directory unavailable at {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration that must be positive was zero
    #[error("Duration '{field}' must be positive")]
    NonPositiveDuration { field: &'static str },
}

/// Failure reported by a state observer.
///
/// The session driver logs these and keeps ticking.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// Cue playback failed or is unavailable
    #[error("Cue playback failed: {0}")]
    Cue(String),

    /// History could not be persisted
    #[error("History write failed: {0}")]
    History(#[from] DatabaseError),

    /// Rendering to the terminal or another output failed
    #[error("Output failed: {0}")]
    Output(#[from] std::io::Error),

    /// Observer panicked while handling a tick
    #[error("Observer '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field() {
        let err = ValidationError::NonPositiveDuration { field: "inhale_ms" };
        assert_eq!(err.to_string(), "Duration 'inhale_ms' must be positive");
    }

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::NonPositiveDuration { field: "total_ms" }.into();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        // SQLITE_BUSY maps to ErrorCode::DatabaseBusy, not DatabaseLocked.
        assert!(matches!(DatabaseError::from(raw), DatabaseError::QueryFailed(_)));

        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(raw), DatabaseError::Locked));
    }
}
