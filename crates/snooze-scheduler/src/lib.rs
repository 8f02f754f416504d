//! `snooze-scheduler` — one-shot HTTP call scheduling on top of the durable
//! queue.
//!
//! # Overview
//!
//! Callers register an HTTP request to be fired once at a future instant and
//! can cancel it by id until it starts executing. The subsystem splits into:
//!
//! | Module     | Role                                                     |
//! |------------|----------------------------------------------------------|
//! | [`resolve`]| turns a raw `runAt` string into an absolute UTC instant  |
//! | [`caller`] | performs the single outbound request and classifies it   |
//! | [`service`]| validation, enqueue and cancellation                     |
//! | [`dispatch`]| background loop claiming due jobs and recording outcomes|
//!
//! Dispatch is at-most-once: the queue's state-guarded claim hands a job to
//! exactly one dispatcher, and a failed call is recorded as the job's
//! terminal state without any retry.

pub mod caller;
pub mod dispatch;
pub mod error;
pub mod resolve;
pub mod service;
pub mod types;

pub use caller::{CallError, CallSuccess, HttpCaller};
pub use dispatch::Dispatcher;
pub use error::{Result, SchedulerError};
pub use resolve::resolve_run_at;
pub use service::{job_name, RemoveOutcome, SchedulerService};
pub use types::{HttpMethod, JobPayload};
