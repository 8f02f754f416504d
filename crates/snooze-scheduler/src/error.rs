use thiserror::Error;

/// Validation and store errors surfaced by the scheduler service.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `targetUrl` is not a well-formed absolute http(s) URL.
    #[error("targetUrl must be a valid absolute http(s) URL")]
    InvalidUrl,

    /// The method is outside the supported set.
    #[error("Unsupported HTTP method {0}")]
    UnsupportedMethod(String),

    /// `runAt` matches neither HH:mm nor a parseable date-time string.
    #[error("runAt must be either HH:mm or an ISO-8601 date string")]
    InvalidRunAt,

    /// The resolved instant is not strictly in the future.
    #[error("runAt must be in the future")]
    PastRunAt,

    /// Futurity re-check at enqueue time failed (the boundary was crossed
    /// while processing).
    #[error("runAt must be in the future")]
    NonPositiveDelay,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying queue error.
    #[error(transparent)]
    Queue(#[from] snooze_queue::QueueError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
