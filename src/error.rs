//! Error types for the Frontdesk help desk
//!
//! This module provides structured error definitions with thiserror. Every
//! operation in the library returns [`Result`]; the binary wraps it in anyhow
//! only at the outermost edge.

use thiserror::Error;

/// Main error type for Frontdesk operations
#[derive(Error, Debug)]
pub enum FrontdeskError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// User input rejected before any write was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current state (e.g. resolving twice)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid identifier format
    #[error("Invalid id: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Frontdesk operations
pub type Result<T> = std::result::Result<T, FrontdeskError>;

impl From<libsql::Error> for FrontdeskError {
    fn from(err: libsql::Error) -> Self {
        FrontdeskError::Database(err.to_string())
    }
}

impl FrontdeskError {
    /// True for failures caused by the caller's input rather than the backend
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FrontdeskError::Validation(_)
                | FrontdeskError::NotFound(_)
                | FrontdeskError::InvalidOperation(_)
                | FrontdeskError::InvalidId(_)
        )
    }
}
