//! Error types for filestash
//!
//! Absence of a user, category or file is never an error; these variants
//! cover genuine backend and I/O failures only.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for store, backup and restore operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached while opening the store
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Persisted state could not be parsed
    #[error("Corrupt state in {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// A snapshot file failed schema validation
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    /// An individual operation failed after the store was opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Caller-supplied input was rejected
    #[error("Validation error: {0}")]
    Validation(String),

    /// A named item the CLI was asked for does not exist
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors outside the state file (backup directory, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl StoreError {
    /// Create a "not found" error for backup files
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a startup connection failure
    pub fn is_connection_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionUnavailable(_))
    }

    /// Check if this is a snapshot format error
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormat(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

/// Result type alias for filestash operations
pub type StoreResult<T> = Result<T, StoreError>;
