//! `snooze-queue` — durable delayed-job queue over SQLite.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table together with the instant at
//! which they become claimable. The queue hands out due jobs with
//! at-most-once semantics: a claim flips `pending → active` through a
//! state-guarded UPDATE, so even several dispatcher processes sharing the
//! database file cannot claim the same job twice.
//!
//! # Job lifecycle
//!
//! | Transition            | Caller                                        |
//! |-----------------------|-----------------------------------------------|
//! | `(new) → pending`     | [`JobQueue::enqueue`]                         |
//! | `pending → active`    | [`JobQueue::claim_due`]                       |
//! | `active → completed`  | [`JobQueue::complete`] (deletes the row when  |
//! |                       | `remove_on_complete` is set)                  |
//! | `active → failed`     | [`JobQueue::fail`]                            |
//! | `pending → (deleted)` | [`JobQueue::remove`] — refused while `active` |

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{QueueError, Result};
pub use store::{JobQueue, QueueCounts};
pub use types::{EnqueueOptions, Job, JobState};
