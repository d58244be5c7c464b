//! Error types for tabreload
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the reload engine
#[derive(Debug, Error)]
pub enum ReloadError {
    /// Settings store read/write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A host collaborator (tabs, alarms, menus) rejected a call
    #[error("Host error: {0}")]
    Host(String),

    /// Tab no longer exists (closed mid-scan)
    #[error("Tab not found: {0}")]
    TabNotFound(i64),

    /// Job definition rejected on creation
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// Job id not present in the job list
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Capability not granted
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for reload engine operations
pub type Result<T> = std::result::Result<T, ReloadError>;
