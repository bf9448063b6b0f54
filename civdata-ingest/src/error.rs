//! Error types for civdata-ingest
//!
//! Adapter failures have their own type ([`crate::types::AdapterError`]) because
//! they never leave the adapter runner; everything past that boundary uses
//! [`PipelineError`].

use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Roster entry cannot be processed (e.g. empty name)
    #[error("Invalid roster entry: {0}")]
    InvalidEntry(String),

    /// Crosswalk lookup or update failed
    #[error("Entity resolution failed: {0}")]
    Resolution(String),

    /// Upsert rejected or could not complete
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON (de)serialization of stored columns
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// civdata-common error (config, IO)
    #[error("Common error: {0}")]
    Common(#[from] civdata_common::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True when SQLite reported a lock conflict (retryable)
    pub fn is_database_locked(&self) -> bool {
        match self {
            PipelineError::Database(err) => err.to_string().contains("database is locked"),
            PipelineError::Common(err) => err.is_database_locked(),
            _ => false,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
