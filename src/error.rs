//! Error types for the byplay job queue library.

use thiserror::Error;

/// The main error type for the byplay library.
#[derive(Error, Debug)]
pub enum ByplayError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Argument serialization/deserialization error.
    #[error("args serialization error: {0}")]
    Args(#[from] serde_json::Error),

    /// A queue tag contained a namespace separator.
    #[error("queue tag {0:?} must not contain a namespace separator")]
    NamespacedQueue(String),

    /// A queue tag was empty.
    #[error("queue tag must not be empty")]
    EmptyQueueTag,

    /// A job name had no entry in the registry.
    #[error("job {0:?} is not registered")]
    UnknownJob(String),

    /// The single-shot worker lifecycle was violated.
    #[error("worker error: {0}")]
    Worker(String),
}

/// Result type alias using ByplayError.
pub type Result<T> = std::result::Result<T, ByplayError>;
