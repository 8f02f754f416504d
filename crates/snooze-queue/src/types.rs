use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job row.
///
/// Cancellation is realized as row deletion, so a live row is always in one
/// of these four states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for its run_at instant.
    Pending,
    /// Claimed by a dispatcher and currently executing.
    Active,
    /// Finished successfully (only rows without remove_on_complete survive).
    Completed,
    /// The single execution attempt reported an error.
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// Per-enqueue options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Delete the row immediately after a successful run instead of keeping
    /// a `completed` record.
    pub remove_on_complete: bool,
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 string — store-internal primary key.
    pub id: String,
    /// Caller-facing lookup key; NOT unique, duplicates are allowed.
    pub name: String,
    /// Opaque JSON payload forwarded to the executor.
    pub payload: String,
    /// Current lifecycle state.
    pub state: JobState,
    /// Instant at which the job becomes claimable.
    pub run_at: DateTime<Utc>,
    /// Discard the row after a successful run.
    pub remove_on_complete: bool,
    /// ISO-8601 timestamp of the claim, if the job was ever claimed.
    pub attempted_at: Option<String>,
    /// JSON outcome (completed) or error text (failed), if terminal.
    pub result: Option<String>,
    /// ISO-8601 timestamp of row creation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last state change.
    pub updated_at: String,
}
