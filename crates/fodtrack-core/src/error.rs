//! Core error types for fodtrack-core.
//!
//! This module defines the error hierarchy using thiserror. Validation
//! errors surface before any store access; store failures abort the
//! whole step without committing partial state.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for fodtrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A required prerequisite record is missing
    #[error("{resource} not found for user {user_id}")]
    NotFound {
        resource: MissingResource,
        user_id: i64,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which prerequisite record was absent when an engine operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingResource {
    User,
    PhaseState,
    Phase2Start,
    Phase2Tracking,
}

impl std::fmt::Display for MissingResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MissingResource::User => "user",
            MissingResource::PhaseState => "phase state",
            MissingResource::Phase2Start => "phase 2 start date",
            MissingResource::Phase2Tracking => "phase 2 tracking record",
        };
        f.write_str(name)
    }
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Malformed timezone offset string
    #[error("Invalid timezone offset '{input}': expected Z, UTC, or +HH:MM/-HH:MM")]
    InvalidTimezone { input: String },

    /// Symptom severity outside the 0-10 range
    #[error("Severity for '{field}' out of range: {value} (expected 0-10)")]
    SeverityOutOfRange { field: &'static str, value: i64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
