//! Queue consumer.
//!
//! A [`Worker`] polls one queue, runs up to `concurrency` handlers at once,
//! and records each outcome:
//!
//! ```text
//! waiting/delayed ──claim──> active ──ok──────────────> completed
//!                              │
//!                              ├─err, attempts left──> delayed (run_at = now + backoff)
//!                              └─err, exhausted─────> failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boxoffice_db::models::queue_job::QueueJob;
use boxoffice_db::repositories::QueueJobRepo;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::JobQueue;
use crate::error::QueueError;

/// Default polling interval when the queue is idle.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Jobs active for longer than this are considered abandoned.
const DEFAULT_STALLED_AFTER: Duration = Duration::from_secs(300);

/// `tokio::time::interval` panics on a zero period.
const MIN_TICK: Duration = Duration::from_millis(10);

/// Why a handler gave up on a job.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub message: String,
    /// Permanent failures skip the remaining attempts.
    pub permanent: bool,
}

impl JobFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            permanent: false,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            permanent: true,
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Processes the jobs of one queue.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Run one job. The returned value is stored as the job's result.
    async fn handle(&self, job: &QueueJob) -> Result<serde_json::Value, JobFailure>;
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub stalled_after: Duration,
}

impl WorkerOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stalled_after: DEFAULT_STALLED_AFTER,
        }
    }
}

/// What happened to a processed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { delay: Duration },
    Failed,
}

pub struct Worker<H> {
    queue: JobQueue,
    handler: Arc<H>,
    options: WorkerOptions,
}

impl<H: JobHandler> Worker<H> {
    pub fn new(queue: JobQueue, handler: H, options: WorkerOptions) -> Self {
        Self {
            queue,
            handler: Arc::new(handler),
            options,
        }
    }

    /// Poll and process jobs until `cancel` fires, then wait for in-flight
    /// jobs to finish.
    pub async fn run(&self, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut poll = tokio::time::interval(self.options.poll_interval.max(MIN_TICK));
        let mut stall_check = tokio::time::interval((self.options.stalled_after / 2).max(MIN_TICK));

        tracing::info!(
            queue = self.queue.name(),
            concurrency = self.options.concurrency,
            poll_interval_ms = self.options.poll_interval.as_millis() as u64,
            "Queue worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(queue = self.queue.name(), "Queue worker stopping");
                    break;
                }
                _ = stall_check.tick() => {
                    self.recover_stalled().await;
                }
                _ = poll.tick() => {
                    self.fill_slots(&semaphore, &mut in_flight).await;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(queue = self.queue.name(), error = %e, "Job task panicked");
                    }
                }
            }
        }

        let remaining = in_flight.len();
        if remaining > 0 {
            tracing::info!(queue = self.queue.name(), remaining, "Draining in-flight jobs");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(queue = self.queue.name(), error = %e, "Job task panicked");
            }
        }
        tracing::info!(queue = self.queue.name(), "Queue worker stopped");
    }

    /// Claim and run at most one job inline.
    pub async fn run_once(&self) -> Result<Option<(QueueJob, JobOutcome)>, QueueError> {
        let Some(job) = QueueJobRepo::claim_next(self.queue.pool(), self.queue.name()).await?
        else {
            return Ok(None);
        };
        let outcome = process(self.queue.pool(), self.handler.as_ref(), &job).await?;
        Ok(Some((job, outcome)))
    }

    /// Claim jobs while permits are free.
    async fn fill_slots(&self, semaphore: &Arc<Semaphore>, in_flight: &mut JoinSet<()>) {
        loop {
            let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
                return;
            };
            let job = match QueueJobRepo::claim_next(self.queue.pool(), self.queue.name()).await {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(queue = self.queue.name(), error = %e, "Failed to claim job");
                    return;
                }
            };

            let pool = self.queue.pool().clone();
            let handler = Arc::clone(&self.handler);
            in_flight.spawn(async move {
                let _permit = permit;
                if let Err(e) = process(&pool, handler.as_ref(), &job).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to record job outcome");
                }
            });
        }
    }

    async fn recover_stalled(&self) {
        let secs = self.options.stalled_after.as_secs() as i64;
        match QueueJobRepo::recover_stalled(self.queue.pool(), self.queue.name(), secs).await {
            Ok((0, 0)) => {}
            Ok((requeued, failed)) => {
                tracing::warn!(queue = self.queue.name(), requeued, failed, "Recovered stalled jobs");
            }
            Err(e) => {
                tracing::error!(queue = self.queue.name(), error = %e, "Stall recovery failed");
            }
        }
    }
}

/// Run the handler on a claimed job and persist the outcome.
async fn process<H: JobHandler + ?Sized>(
    pool: &PgPool,
    handler: &H,
    job: &QueueJob,
) -> Result<JobOutcome, QueueError> {
    tracing::debug!(
        job_id = job.id,
        queue = %job.queue,
        job = %job.name,
        attempt = job.attempts_made,
        "Processing job",
    );

    match handler.handle(job).await {
        Ok(result) => {
            QueueJobRepo::complete(pool, job.id, &result).await?;
            tracing::info!(job_id = job.id, queue = %job.queue, "Job completed");
            Ok(JobOutcome::Completed)
        }
        Err(failure) if !failure.permanent && job.options().can_retry(job.attempts_made) => {
            let delay = job.options().delay_for(job.attempts_made);
            let run_at = chrono::Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
            QueueJobRepo::schedule_retry(pool, job.id, &failure.message, run_at).await?;
            tracing::warn!(
                job_id = job.id,
                queue = %job.queue,
                attempt = job.attempts_made,
                max_attempts = job.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Job failed, retry scheduled",
            );
            Ok(JobOutcome::Retrying { delay })
        }
        Err(failure) => {
            QueueJobRepo::fail(pool, job.id, &failure.message).await?;
            tracing::error!(
                job_id = job.id,
                queue = %job.queue,
                attempts = job.attempts_made,
                error = %failure,
                "Job failed permanently",
            );
            Ok(JobOutcome::Failed)
        }
    }
}
