//! Repository for the `queue_jobs` table.
//!
//! State changes use [`JobState`] ids; no magic numbers. Claiming uses
//! `FOR UPDATE SKIP LOCKED` so any number of workers can poll one queue.

use boxoffice_core::paging::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use boxoffice_core::status::{JobState, StatusId};
use boxoffice_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::queue_job::{JobCounts, NewQueueJob, QueueJob};

/// Column list for `queue_jobs` queries.
const COLUMNS: &str = "\
    id, queue, name, payload, state_id, attempts_made, max_attempts, backoff_ms, \
    run_at, started_at, finished_at, last_error, result, created_at, updated_at";

pub struct QueueJobRepo;

impl QueueJobRepo {
    /// Enqueue a job. It starts `waiting`, or `delayed` when `run_at` is in
    /// the future.
    pub async fn enqueue(pool: &PgPool, input: &NewQueueJob) -> Result<QueueJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_jobs (queue, name, payload, state_id, max_attempts, backoff_ms, run_at) \
             VALUES ($1, $2, $3, \
                     CASE WHEN COALESCE($6, NOW()) > NOW() THEN $5 ELSE $4 END, \
                     $7, $8, COALESCE($6, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(&input.queue)
            .bind(&input.name)
            .bind(&input.payload)
            .bind(JobState::Waiting.id())
            .bind(JobState::Delayed.id())
            .bind(input.run_at)
            .bind(input.options.max_attempts)
            .bind(input.options.backoff_ms)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_jobs WHERE id = $1");
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the next runnable job on `queue`.
    ///
    /// Runnable means `waiting`, or `delayed` with `run_at` reached. The
    /// claim marks the job `active` and counts the attempt.
    pub async fn claim_next(pool: &PgPool, queue: &str) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET state_id = $2, attempts_made = attempts_made + 1, \
                 started_at = NOW(), finished_at = NULL \
             WHERE id = ( \
                 SELECT id FROM queue_jobs \
                 WHERE queue = $1 AND state_id IN ($3, $4) AND run_at <= NOW() \
                 ORDER BY run_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue)
            .bind(JobState::Active.id())
            .bind(JobState::Waiting.id())
            .bind(JobState::Delayed.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark an active job completed and store its result.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, result = $3, finished_at = NOW(), last_error = NULL \
             WHERE id = $1 AND state_id = $4",
        )
        .bind(id)
        .bind(JobState::Completed.id())
        .bind(result)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Put an active job back as `delayed` until `run_at`.
    pub async fn schedule_retry(
        pool: &PgPool,
        id: DbId,
        error: &str,
        run_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, last_error = $3, run_at = $4, started_at = NULL \
             WHERE id = $1 AND state_id = $5",
        )
        .bind(id)
        .bind(JobState::Delayed.id())
        .bind(error)
        .bind(run_at)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark an active job permanently failed.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, last_error = $3, finished_at = NOW() \
             WHERE id = $1 AND state_id = $4",
        )
        .bind(id)
        .bind(JobState::Failed.id())
        .bind(error)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Recover jobs left `active` by a worker that died.
    ///
    /// Jobs with attempts left go back to `waiting`; the rest are failed.
    /// Returns `(requeued, failed)`.
    pub async fn recover_stalled(
        pool: &PgPool,
        queue: &str,
        stalled_after_secs: i64,
    ) -> Result<(u64, u64), sqlx::Error> {
        let requeued = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, started_at = NULL, last_error = 'job stalled' \
             WHERE queue = $1 AND state_id = $3 \
               AND started_at < NOW() - make_interval(secs => $4) \
               AND attempts_made < max_attempts",
        )
        .bind(queue)
        .bind(JobState::Waiting.id())
        .bind(JobState::Active.id())
        .bind(stalled_after_secs as f64)
        .execute(pool)
        .await?
        .rows_affected();

        let failed = sqlx::query(
            "UPDATE queue_jobs \
             SET state_id = $2, finished_at = NOW(), last_error = 'job stalled' \
             WHERE queue = $1 AND state_id = $3 \
               AND started_at < NOW() - make_interval(secs => $4)",
        )
        .bind(queue)
        .bind(JobState::Failed.id())
        .bind(JobState::Active.id())
        .bind(stalled_after_secs as f64)
        .execute(pool)
        .await?
        .rows_affected();

        Ok((requeued, failed))
    }

    /// Reset a failed job to `waiting` with a fresh attempt budget.
    pub async fn retry(pool: &PgPool, queue: &str, id: DbId) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET state_id = $3, attempts_made = 0, run_at = NOW(), \
                 started_at = NULL, finished_at = NULL, last_error = NULL \
             WHERE id = $1 AND queue = $2 AND state_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(id)
            .bind(queue)
            .bind(JobState::Waiting.id())
            .bind(JobState::Failed.id())
            .fetch_optional(pool)
            .await
    }

    /// Delete a job that is not currently running. Returns `true` if removed.
    pub async fn remove(pool: &PgPool, queue: &str, id: DbId) -> Result<bool, sqlx::Error> {
        let outcome =
            sqlx::query("DELETE FROM queue_jobs WHERE id = $1 AND queue = $2 AND state_id <> $3")
                .bind(id)
                .bind(queue)
                .bind(JobState::Active.id())
                .execute(pool)
                .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Count jobs per state on one queue.
    pub async fn counts(pool: &PgPool, queue: &str) -> Result<JobCounts, sqlx::Error> {
        let rows: Vec<(StatusId, i64)> = sqlx::query_as(
            "SELECT state_id, COUNT(*) FROM queue_jobs WHERE queue = $1 GROUP BY state_id",
        )
        .bind(queue)
        .fetch_all(pool)
        .await?;

        let mut counts = JobCounts::default();
        for (state_id, count) in rows {
            if let Some(state) = JobState::from_id(state_id) {
                counts.set(state, count);
            }
        }
        Ok(counts)
    }

    /// List jobs in one state, oldest first for pending states and newest
    /// first for finished ones.
    pub async fn list_by_state(
        pool: &PgPool,
        queue: &str,
        state: JobState,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<QueueJob>, sqlx::Error> {
        let limit = clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        let offset = clamp_offset(offset);
        let order = match state {
            JobState::Waiting | JobState::Delayed => "run_at ASC, id ASC",
            JobState::Active => "started_at ASC, id ASC",
            JobState::Completed | JobState::Failed => "finished_at DESC, id DESC",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM queue_jobs \
             WHERE queue = $1 AND state_id = $2 \
             ORDER BY {order} \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue)
            .bind(state.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
