use rusqlite::Connection;

use crate::error::Result;

/// Initialise the queue schema in `conn`.
///
/// Creates the `jobs` table (idempotent), an index on `(state, run_at)` so
/// the claim poll stays efficient with thousands of pending jobs, and an
/// index on `name` for the cancellation lookup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id                  TEXT    NOT NULL PRIMARY KEY,
            name                TEXT    NOT NULL,
            payload             TEXT    NOT NULL,   -- opaque JSON payload
            state               TEXT    NOT NULL DEFAULT 'pending',
            run_at              TEXT    NOT NULL,   -- ISO-8601, UTC offset
            remove_on_complete  INTEGER NOT NULL DEFAULT 0,
            attempted_at        TEXT,               -- ISO-8601 or NULL
            result              TEXT,               -- JSON outcome / error text
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        ) STRICT;

        -- Claim poll: SELECT … WHERE state = 'pending' AND run_at <= ?
        CREATE INDEX IF NOT EXISTS idx_jobs_state_run_at ON jobs (state, run_at);

        -- Cancellation: SELECT … WHERE name = ?
        CREATE INDEX IF NOT EXISTS idx_jobs_name ON jobs (name);
        ",
    )?;
    Ok(())
}
