//! Core error types for trackmeet-core.
//!
//! Sensor and transition failures are reported, never fatal. Arithmetic edge
//! cases (zero elapsed time, zero distance) are absorbed by the metric code and
//! have no variant here.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionPhase;

/// Core error type for trackmeet-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session state machine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors surfaced by the session state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Location permission was refused; the session stays `Idle`.
    #[error("Permission to access location was denied")]
    PermissionDenied,

    /// A command was issued from a phase that does not allow it.
    /// State is left unchanged.
    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },

    /// The geolocation source failed to deliver a subscription.
    #[error("Location source failed: {0}")]
    Source(#[from] SourceError),
}

/// Errors reported by a [`GeoSampleSource`](crate::geo::GeoSampleSource).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Platform watcher could not be created
    #[error("location source unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
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
    QueryFailed(#[from] rusqlite::Error),

    /// A stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: &'static str, message: String },
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::QueryFailed(e))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::ParseFailed(e.to_string())
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Custom(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Custom(s.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_action_and_phase() {
        let err = SessionError::InvalidTransition {
            action: "stop",
            phase: SessionPhase::Idle,
        };
        assert_eq!(err.to_string(), "Cannot stop while idle");
    }

    #[test]
    fn session_error_converts_into_core_error() {
        let err: CoreError = SessionError::PermissionDenied.into();
        assert!(matches!(err, CoreError::Session(SessionError::PermissionDenied)));
    }
}
