use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::init_db,
    error::{QueueError, Result},
    types::{EnqueueOptions, Job, JobState},
};

const JOB_COLUMNS: &str = "id, name, payload, state, run_at, remove_on_complete,
                           attempted_at, result, created_at, updated_at";

/// Per-state row counts for introspection.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Shared handle to the durable queue.
///
/// Clones share one `Connection` behind a mutex; SQLite serializes writers,
/// so management calls and the dispatcher poll never observe a half-applied
/// state transition.
#[derive(Clone)]
pub struct JobQueue {
    conn: Arc<Mutex<Connection>>,
}

impl JobQueue {
    /// Wrap an open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory queue for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Persist a new `pending` job claimable at `run_at`.
    ///
    /// `name` is a lookup key, not an identity: enqueueing the same name
    /// twice yields two independent rows.
    pub fn enqueue(
        &self,
        name: &str,
        payload: serde_json::Value,
        run_at: DateTime<Utc>,
        opts: EnqueueOptions,
    ) -> Result<Job> {
        let conn = self.conn.lock().unwrap();
        let now_str = Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        let payload_str = payload.to_string();

        conn.execute(
            "INSERT INTO jobs
             (id, name, payload, state, run_at, remove_on_complete,
              attempted_at, result, created_at, updated_at)
             VALUES (?1,?2,?3,'pending',?4,?5,NULL,NULL,?6,?6)",
            rusqlite::params![
                id,
                name,
                payload_str,
                run_at.to_rfc3339(),
                opts.remove_on_complete,
                now_str
            ],
        )?;

        info!(job_id = %id, %name, run_at = %run_at, "job enqueued");

        Ok(Job {
            id,
            name: name.to_string(),
            payload: payload_str,
            state: JobState::Pending,
            run_at,
            remove_on_complete: opts.remove_on_complete,
            attempted_at: None,
            result: None,
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    /// All non-terminal (pending or active) jobs carrying `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE name = ?1 AND state IN ('pending', 'active')
             ORDER BY created_at",
        ))?;
        let jobs = stmt
            .query_map([name], row_to_parts)?
            .filter_map(|r| r.ok().and_then(parts_to_job))
            .collect();
        Ok(jobs)
    }

    /// Claim every job whose `run_at` has elapsed, flipping it to `active`.
    ///
    /// The flip is a state-guarded UPDATE: an affected-row count of 1 means
    /// this caller owns the job, 0 means another claimer (or a concurrent
    /// removal) won the race. A job is never returned before its `run_at`.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let now_str = now.to_rfc3339();

        // Collect eagerly inside the block so `stmt` is dropped before we
        // borrow `conn` again for the UPDATEs below.
        let due: Vec<Job> = {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE state = 'pending' AND run_at <= ?1
                 ORDER BY run_at",
            ))?;
            let jobs = stmt.query_map([&now_str], row_to_parts)?
                .filter_map(|r| r.ok().and_then(parts_to_job))
                .collect();
            jobs
        };

        let mut claimed = Vec::new();
        for mut job in due {
            let n = conn.execute(
                "UPDATE jobs SET state = 'active', attempted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND state = 'pending'",
                rusqlite::params![now_str, job.id],
            )?;
            if n == 1 {
                job.state = JobState::Active;
                job.attempted_at = Some(now_str.clone());
                job.updated_at = now_str.clone();
                claimed.push(job);
            }
        }
        Ok(claimed)
    }

    /// Delete a `pending` job. An `active` job is refused with `JobActive`;
    /// an unknown id with `JobNotFound`.
    pub fn remove(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM jobs WHERE id = ?1 AND state = 'pending'",
            [id],
        )?;
        if n == 1 {
            info!(job_id = %id, "job removed");
            return Ok(());
        }

        let state: Option<String> = conn
            .query_row("SELECT state FROM jobs WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match state.as_deref() {
            Some("active") => Err(QueueError::JobActive { id: id.to_string() }),
            _ => Err(QueueError::JobNotFound { id: id.to_string() }),
        }
    }

    /// Record a successful run. Rows enqueued with `remove_on_complete` are
    /// discarded outright; others keep a `completed` record with `result`.
    pub fn complete(&self, id: &str, result: serde_json::Value) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let discard: bool = conn
            .query_row(
                "SELECT remove_on_complete FROM jobs WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    QueueError::JobNotFound { id: id.to_string() }
                }
                other => QueueError::Database(other),
            })?;

        if discard {
            conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        } else {
            conn.execute(
                "UPDATE jobs SET state = 'completed', result = ?1, updated_at = ?2
                 WHERE id = ?3",
                rusqlite::params![result.to_string(), Utc::now().to_rfc3339(), id],
            )?;
        }
        info!(job_id = %id, discard, "job completed");
        Ok(())
    }

    /// Record a failed run. The row stays queryable as `failed` until it is
    /// explicitly cleaned up.
    pub fn fail(&self, id: &str, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE jobs SET state = 'failed', result = ?1, updated_at = ?2
             WHERE id = ?3",
            rusqlite::params![error, Utc::now().to_rfc3339(), id],
        )?;
        if n == 0 {
            return Err(QueueError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, %error, "job failed");
        Ok(())
    }

    /// Per-state row counts for the dashboard.
    pub fn counts(&self) -> Result<QueueCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
        let mut counts = QueueCounts::default();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        for row in rows {
            let (state, n) = row?;
            match state.as_str() {
                "pending" => counts.pending = n,
                "active" => counts.active = n,
                "completed" => counts.completed = n,
                "failed" => counts.failed = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    /// Most recently created jobs, newest first.
    pub fn list_jobs(&self, limit: u32) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC LIMIT ?1",
        ))?;
        let jobs = stmt
            .query_map([limit], row_to_parts)?
            .filter_map(|r| r.ok().and_then(parts_to_job))
            .collect();
        Ok(jobs)
    }
}

type JobParts = (
    String,         // id
    String,         // name
    String,         // payload
    String,         // state
    String,         // run_at
    bool,           // remove_on_complete
    Option<String>, // attempted_at
    Option<String>, // result
    String,         // created_at
    String,         // updated_at
);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn parts_to_job(parts: JobParts) -> Option<Job> {
    let (
        id,
        name,
        payload,
        state_str,
        run_at_str,
        remove_on_complete,
        attempted_at,
        result,
        created_at,
        updated_at,
    ) = parts;
    let state: JobState = state_str.parse().ok()?;
    let run_at = DateTime::parse_from_rfc3339(&run_at_str)
        .ok()?
        .with_timezone(&Utc);
    Some(Job {
        id,
        name,
        payload,
        state,
        run_at,
        remove_on_complete,
        attempted_at,
        result,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn queue() -> JobQueue {
        JobQueue::open_in_memory().unwrap()
    }

    fn enqueue_at(q: &JobQueue, name: &str, run_at: DateTime<Utc>) -> Job {
        q.enqueue(name, json!({"k": "v"}), run_at, EnqueueOptions::default())
            .unwrap()
    }

    #[test]
    fn claim_returns_nothing_before_run_at() {
        let q = queue();
        let now = Utc::now();
        enqueue_at(&q, "HttpCall-1", now + Duration::minutes(5));

        assert!(q.claim_due(now).unwrap().is_empty());
    }

    #[test]
    fn claim_picks_up_due_job_exactly_once() {
        let q = queue();
        let now = Utc::now();
        let job = enqueue_at(&q, "HttpCall-1", now - Duration::seconds(1));

        let first = q.claim_due(now).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, job.id);
        assert_eq!(first[0].state, JobState::Active);

        // Second poll sees no pending rows — at most one claimer.
        assert!(q.claim_due(now).unwrap().is_empty());
    }

    #[test]
    fn overdue_pending_jobs_survive_and_stay_claimable() {
        // Simulates a restart: run_at long past, job still pending.
        let q = queue();
        let now = Utc::now();
        enqueue_at(&q, "HttpCall-1", now - Duration::hours(3));

        assert_eq!(q.claim_due(now).unwrap().len(), 1);
    }

    #[test]
    fn pending_job_can_be_removed() {
        let q = queue();
        let job = enqueue_at(&q, "HttpCall-1", Utc::now() + Duration::minutes(5));

        q.remove(&job.id).unwrap();
        assert!(q.find_by_name("HttpCall-1").unwrap().is_empty());
    }

    #[test]
    fn active_job_cannot_be_removed() {
        let q = queue();
        let now = Utc::now();
        let job = enqueue_at(&q, "HttpCall-1", now - Duration::seconds(1));
        q.claim_due(now).unwrap();

        match q.remove(&job.id) {
            Err(QueueError::JobActive { id }) => assert_eq!(id, job.id),
            other => panic!("expected JobActive, got {other:?}"),
        }
    }

    #[test]
    fn removing_unknown_id_is_not_found() {
        let q = queue();
        assert!(matches!(
            q.remove("nope"),
            Err(QueueError::JobNotFound { .. })
        ));
    }

    #[test]
    fn complete_discards_row_when_requested() {
        let q = queue();
        let now = Utc::now();
        let job = q
            .enqueue(
                "HttpCall-1",
                json!({}),
                now - Duration::seconds(1),
                EnqueueOptions {
                    remove_on_complete: true,
                },
            )
            .unwrap();
        q.claim_due(now).unwrap();

        q.complete(&job.id, json!({"status": 200})).unwrap();
        let counts = q.counts().unwrap();
        assert_eq!(counts.completed, 0);
        assert!(q.list_jobs(10).unwrap().is_empty());
    }

    #[test]
    fn complete_keeps_record_without_discard_option() {
        let q = queue();
        let now = Utc::now();
        let job = enqueue_at(&q, "HttpCall-1", now - Duration::seconds(1));
        q.claim_due(now).unwrap();

        q.complete(&job.id, json!({"status": 204})).unwrap();
        let jobs = q.list_jobs(10).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].state, JobState::Completed);
        assert!(jobs[0].result.as_deref().unwrap().contains("204"));
    }

    #[test]
    fn fail_keeps_row_queryable_with_error() {
        let q = queue();
        let now = Utc::now();
        let job = enqueue_at(&q, "HttpCall-1", now - Duration::seconds(1));
        q.claim_due(now).unwrap();

        q.fail(&job.id, "Request failed with status 503").unwrap();
        let jobs = q.list_jobs(10).unwrap();
        assert_eq!(jobs[0].state, JobState::Failed);
        assert_eq!(
            jobs[0].result.as_deref(),
            Some("Request failed with status 503")
        );
        assert_eq!(q.counts().unwrap().failed, 1);
    }

    #[test]
    fn find_by_name_returns_all_duplicates() {
        let q = queue();
        let later = Utc::now() + Duration::minutes(5);
        enqueue_at(&q, "HttpCall-7", later);
        enqueue_at(&q, "HttpCall-7", later);
        enqueue_at(&q, "HttpCall-8", later);

        assert_eq!(q.find_by_name("HttpCall-7").unwrap().len(), 2);
        assert_eq!(q.find_by_name("HttpCall-8").unwrap().len(), 1);
        assert!(q.find_by_name("HttpCall-9").unwrap().is_empty());
    }

    #[test]
    fn counts_track_states() {
        let q = queue();
        let now = Utc::now();
        enqueue_at(&q, "HttpCall-1", now + Duration::minutes(5));
        enqueue_at(&q, "HttpCall-2", now - Duration::seconds(1));
        q.claim_due(now).unwrap();

        let counts = q.counts().unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.active, 1);
    }
}
