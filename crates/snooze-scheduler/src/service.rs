use chrono::{DateTime, Duration, Utc};
use tracing::info;

use snooze_queue::{EnqueueOptions, JobQueue, QueueError};

use crate::{
    error::{Result, SchedulerError},
    resolve::resolve_run_at,
    types::{HttpMethod, JobPayload},
};

/// Prefix turning a caller-supplied id into the store lookup key. The mapping
/// is bijective within the pending set: stripping the prefix recovers the id.
pub const JOB_NAME_PREFIX: &str = "HttpCall-";

pub fn job_name(id: &str) -> String {
    format!("{JOB_NAME_PREFIX}{id}")
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// No pending or active job carried the id at all — distinct from
    /// "found but could not remove".
    NotFound,
    /// Matches were processed; `failed` counts jobs that were already
    /// executing (or vanished mid-removal).
    Matched { removed: u32, failed: u32 },
}

/// Validates scheduling requests and drives the queue. All cross-call state
/// lives in the store, so one instance is safely shared across handlers.
#[derive(Clone)]
pub struct SchedulerService {
    queue: JobQueue,
}

impl SchedulerService {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }

    /// Register `target_url` to be called once at the instant `run_at`
    /// resolves to. Returns that instant so the caller can confirm
    /// scheduling. No HTTP call happens here.
    pub fn add_job(
        &self,
        id: &str,
        target_url: &str,
        run_at: &str,
        method: Option<&str>,
    ) -> Result<DateTime<Utc>> {
        let url = url::Url::parse(target_url).map_err(|_| SchedulerError::InvalidUrl)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SchedulerError::InvalidUrl);
        }

        let method: HttpMethod = method.unwrap_or("GET").parse()?;

        let now = Utc::now();
        let resolved = resolve_run_at(run_at, now)?;

        // Resolution already enforces futurity, but the boundary may be
        // crossed while processing.
        let delay = resolved - now;
        if delay <= Duration::zero() {
            return Err(SchedulerError::NonPositiveDelay);
        }

        let payload = JobPayload {
            target_url: target_url.to_string(),
            method: method.as_str().to_string(),
        };
        let job = self.queue.enqueue(
            &job_name(id),
            serde_json::to_value(&payload)?,
            resolved,
            EnqueueOptions {
                remove_on_complete: true,
            },
        )?;

        info!(
            job_id = %job.id,
            name = %job.name,
            scheduled_for = %resolved,
            delay_ms = delay.num_milliseconds(),
            "job scheduled"
        );
        Ok(resolved)
    }

    /// Cancel every pending job registered under `id`. Duplicate ids are
    /// legal, so this is deliberately cancel-all; each match is processed
    /// independently and an already-executing match counts as a failed
    /// removal instead of aborting the rest.
    pub fn remove_job(&self, id: &str) -> Result<RemoveOutcome> {
        let name = job_name(id);
        let matches = self.queue.find_by_name(&name)?;
        if matches.is_empty() {
            return Ok(RemoveOutcome::NotFound);
        }

        let mut removed = 0u32;
        let mut failed = 0u32;
        for job in matches {
            match self.queue.remove(&job.id) {
                Ok(()) => removed += 1,
                Err(QueueError::JobActive { .. }) | Err(QueueError::JobNotFound { .. }) => {
                    failed += 1
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(%name, removed, failed, "remove request processed");
        Ok(RemoveOutcome::Matched { removed, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> (SchedulerService, JobQueue) {
        let queue = JobQueue::open_in_memory().unwrap();
        (SchedulerService::new(queue.clone()), queue)
    }

    const FUTURE: &str = "2099-06-01T12:30:00Z";

    #[test]
    fn add_job_enqueues_with_get_default() {
        let (svc, queue) = service();
        let resolved = svc.add_job("1", "https://example.com", FUTURE, None).unwrap();
        assert_eq!(resolved.to_rfc3339(), "2099-06-01T12:30:00+00:00");

        let jobs = queue.find_by_name("HttpCall-1").unwrap();
        assert_eq!(jobs.len(), 1);
        let payload: JobPayload = serde_json::from_str(&jobs[0].payload).unwrap();
        assert_eq!(payload.method, "GET");
        assert_eq!(payload.target_url, "https://example.com");
        assert!(jobs[0].remove_on_complete);
    }

    #[test]
    fn add_job_normalizes_lowercase_method() {
        let (svc, queue) = service();
        svc.add_job("1", "https://example.com", FUTURE, Some("patch"))
            .unwrap();
        let jobs = queue.find_by_name("HttpCall-1").unwrap();
        let payload: JobPayload = serde_json::from_str(&jobs[0].payload).unwrap();
        assert_eq!(payload.method, "PATCH");
    }

    #[test]
    fn add_job_rejects_unsupported_method() {
        let (svc, queue) = service();
        assert!(matches!(
            svc.add_job("1", "https://example.com", FUTURE, Some("OPTIONS")),
            Err(SchedulerError::UnsupportedMethod(_))
        ));
        assert!(queue.find_by_name("HttpCall-1").unwrap().is_empty());
    }

    #[test]
    fn add_job_rejects_malformed_and_non_http_urls() {
        let (svc, _) = service();
        assert!(matches!(
            svc.add_job("1", "not a url", FUTURE, None),
            Err(SchedulerError::InvalidUrl)
        ));
        assert!(matches!(
            svc.add_job("1", "ftp://example.com", FUTURE, None),
            Err(SchedulerError::InvalidUrl)
        ));
    }

    #[test]
    fn past_run_at_leaves_the_store_untouched() {
        let (svc, queue) = service();
        assert!(matches!(
            svc.add_job("1", "https://example.com", "2000-01-01T00:00:00Z", None),
            Err(SchedulerError::PastRunAt)
        ));
        assert!(queue.find_by_name("HttpCall-1").unwrap().is_empty());
        assert_eq!(queue.counts().unwrap().pending, 0);
    }

    #[test]
    fn remove_without_match_is_not_found_and_idempotent() {
        let (svc, _) = service();
        assert_eq!(svc.remove_job("missing").unwrap(), RemoveOutcome::NotFound);
        assert_eq!(svc.remove_job("missing").unwrap(), RemoveOutcome::NotFound);
    }

    #[test]
    fn duplicate_ids_are_cancelled_together() {
        let (svc, _) = service();
        svc.add_job("7", "https://example.com/a", FUTURE, None).unwrap();
        svc.add_job("7", "https://example.com/b", FUTURE, None).unwrap();

        assert_eq!(
            svc.remove_job("7").unwrap(),
            RemoveOutcome::Matched {
                removed: 2,
                failed: 0
            }
        );
        assert_eq!(svc.remove_job("7").unwrap(), RemoveOutcome::NotFound);
    }

    #[test]
    fn active_match_counts_as_failed_removal() {
        let (svc, queue) = service();
        let now = Utc::now();
        // One match still waiting, one already claimed by a dispatcher.
        queue
            .enqueue(
                "HttpCall-9",
                json!({"targetUrl": "https://example.com", "method": "GET"}),
                now + chrono::Duration::minutes(5),
                EnqueueOptions::default(),
            )
            .unwrap();
        queue
            .enqueue(
                "HttpCall-9",
                json!({"targetUrl": "https://example.com", "method": "GET"}),
                now - chrono::Duration::seconds(1),
                EnqueueOptions::default(),
            )
            .unwrap();
        assert_eq!(queue.claim_due(now).unwrap().len(), 1);

        assert_eq!(
            svc.remove_job("9").unwrap(),
            RemoveOutcome::Matched {
                removed: 1,
                failed: 1
            }
        );
    }
}
