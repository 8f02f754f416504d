use thiserror::Error;

/// Errors that can occur within the queue subsystem.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No job with the given store id exists.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// The job is currently executing and cannot be removed.
    #[error("Job is active and cannot be removed: {id}")]
    JobActive { id: String },
}

pub type Result<T> = std::result::Result<T, QueueError>;
