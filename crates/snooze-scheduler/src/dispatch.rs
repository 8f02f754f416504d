use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};

use snooze_queue::{Job, JobQueue};

use crate::{
    caller::HttpCaller,
    types::{HttpMethod, JobPayload},
};

/// Background worker: claims due jobs from the queue and runs their HTTP
/// call. One failing job never stops the loop; its error becomes the job's
/// terminal state.
pub struct Dispatcher {
    queue: JobQueue,
    caller: HttpCaller,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(queue: JobQueue, caller: HttpCaller, poll_interval: Duration) -> Self {
        Self {
            queue,
            caller,
            poll_interval,
        }
    }

    /// Main loop. Polls the queue until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatcher started");
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("dispatcher tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Claim and execute everything that has come due.
    async fn tick(&self) -> snooze_queue::Result<()> {
        for job in self.queue.claim_due(Utc::now())? {
            self.execute(job).await;
        }
        Ok(())
    }

    async fn execute(&self, job: Job) {
        let payload: JobPayload = match serde_json::from_str(&job.payload) {
            Ok(p) => p,
            Err(e) => {
                error!(job_id = %job.id, "bad payload JSON: {e}");
                self.record_failure(&job.id, &format!("bad payload JSON: {e}"));
                return;
            }
        };
        let method: HttpMethod = match payload.method.parse() {
            Ok(m) => m,
            Err(e) => {
                error!(job_id = %job.id, method = %payload.method, "bad method in payload");
                self.record_failure(&job.id, &e.to_string());
                return;
            }
        };

        info!(job_id = %job.id, name = %job.name, "calling {} {}", method, payload.target_url);

        match self.caller.call(&payload.target_url, method).await {
            Ok(outcome) => {
                info!(job_id = %job.id, status = outcome.status, "call completed");
                let result = json!({
                    "jobId": job.id,
                    "status": outcome.status,
                    "body": outcome.body,
                });
                if let Err(e) = self.queue.complete(&job.id, result) {
                    error!(job_id = %job.id, "failed to record completion: {e}");
                }
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "call failed");
                self.record_failure(&job.id, &e.to_string());
            }
        }
    }

    fn record_failure(&self, job_id: &str, message: &str) {
        if let Err(e) = self.queue.fail(job_id, message) {
            error!(job_id = %job_id, "failed to record failure: {e}");
        }
    }
}
