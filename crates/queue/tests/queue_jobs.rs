use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use boxoffice_core::booking::JobDispatch;
use boxoffice_core::queue::{
    JobOptions, TicketJob, CONFIRMATION_QUEUE, RENDER_ARTIFACT_JOB, SEND_CONFIRMATION_JOB,
    TICKET_ARTIFACT_QUEUE,
};
use boxoffice_core::queue::{CustomerContact, EventSummary, TicketSnapshot};
use boxoffice_core::status::JobState;
use boxoffice_db::models::queue_job::QueueJob;
use boxoffice_queue::worker::JobOutcome;
use boxoffice_queue::{
    JobFailure, JobHandler, JobQueue, PgJobDispatch, QueueError, Worker, WorkerOptions,
};
use serde_json::json;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Test handlers
// ---------------------------------------------------------------------------

struct Succeeds;

#[async_trait]
impl JobHandler for Succeeds {
    async fn handle(&self, job: &QueueJob) -> Result<serde_json::Value, JobFailure> {
        Ok(json!({ "echo": job.payload }))
    }
}

struct AlwaysFails {
    permanent: bool,
}

#[async_trait]
impl JobHandler for AlwaysFails {
    async fn handle(&self, _job: &QueueJob) -> Result<serde_json::Value, JobFailure> {
        if self.permanent {
            Err(JobFailure::permanent("bad payload"))
        } else {
            Err(JobFailure::retryable("smtp timeout"))
        }
    }
}

/// Records the highest number of handlers running at once.
#[derive(Default)]
struct Tracked {
    running: AtomicUsize,
    peak: AtomicUsize,
}

struct TrackedHandler(Arc<Tracked>);

#[async_trait]
impl JobHandler for TrackedHandler {
    async fn handle(&self, _job: &QueueJob) -> Result<serde_json::Value, JobFailure> {
        let now = self.0.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.0.running.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({}))
    }
}

fn queue(pool: &PgPool) -> JobQueue {
    JobQueue::open(pool.clone(), TICKET_ARTIFACT_QUEUE).unwrap()
}

fn worker<H: JobHandler>(q: JobQueue, handler: H) -> Worker<H> {
    Worker::new(q, handler, WorkerOptions::with_concurrency(2))
}

async fn make_runnable(pool: &PgPool, id: i64) {
    sqlx::query("UPDATE queue_jobs SET run_at = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

fn snapshot() -> TicketSnapshot {
    TicketSnapshot {
        reservation_id: 7,
        ticket_code: "TKT-7-abc".to_string(),
        ticket_count: 2,
        total_cents: 3_000,
        event: EventSummary {
            id: 1,
            name: "Gala".to_string(),
            starts_at: chrono::Utc::now(),
            location: None,
            price_cents: 1_500,
        },
        customer: CustomerContact {
            id: 3,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Producer / admin
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_queue_is_rejected(pool: PgPool) {
    assert_matches!(
        JobQueue::open(pool, "emails"),
        Err(QueueError::UnknownQueue(name)) if name == "emails"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn added_job_waits_with_default_policy(pool: PgPool) {
    let q = queue(&pool);
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({ "n": 1 })).await.unwrap();

    assert_eq!(job.state(), Some(JobState::Waiting));
    assert_eq!(job.max_attempts, 3);
    assert_eq!(job.backoff_ms, 1_000);
    assert_eq!(q.counts().await.unwrap().waiting, 1);
    assert_eq!(q.jobs(JobState::Waiting, None, None).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delayed_job_is_not_claimed_early(pool: PgPool) {
    let q = queue(&pool);
    let job = q
        .add_delayed(RENDER_ARTIFACT_JOB, &json!({}), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(job.state(), Some(JobState::Delayed));

    let w = worker(q.clone(), Succeeds);
    assert!(w.run_once().await.unwrap().is_none());

    make_runnable(&pool, job.id).await;
    let (claimed, outcome) = w.run_once().await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);
    assert_eq!(outcome, JobOutcome::Completed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn jobs_are_scoped_to_their_queue(pool: PgPool) {
    let artifacts = queue(&pool);
    let confirmations = JobQueue::open(pool.clone(), CONFIRMATION_QUEUE).unwrap();
    let job = artifacts.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();

    assert_matches!(
        confirmations.get(job.id).await,
        Err(QueueError::JobNotFound { .. })
    );
    assert!(artifacts.get(job.id).await.is_ok());
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn success_stores_result(pool: PgPool) {
    let q = queue(&pool);
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({ "id": 5 })).await.unwrap();

    let (_, outcome) = worker(q.clone(), Succeeds).run_once().await.unwrap().unwrap();
    assert_eq!(outcome, JobOutcome::Completed);

    let stored = q.get(job.id).await.unwrap();
    assert_eq!(stored.state(), Some(JobState::Completed));
    assert_eq!(stored.attempts_made, 1);
    assert_eq!(stored.result, Some(json!({ "echo": { "id": 5 } })));
    assert!(stored.finished_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failures_back_off_then_fail(pool: PgPool) {
    let q = queue(&pool);
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();
    let w = worker(q.clone(), AlwaysFails { permanent: false });

    let (_, first) = w.run_once().await.unwrap().unwrap();
    assert_eq!(first, JobOutcome::Retrying { delay: Duration::from_millis(1_000) });
    let stored = q.get(job.id).await.unwrap();
    assert_eq!(stored.state(), Some(JobState::Delayed));
    assert_eq!(stored.last_error.as_deref(), Some("smtp timeout"));
    assert!(w.run_once().await.unwrap().is_none());

    make_runnable(&pool, job.id).await;
    let (_, second) = w.run_once().await.unwrap().unwrap();
    assert_eq!(second, JobOutcome::Retrying { delay: Duration::from_millis(2_000) });

    make_runnable(&pool, job.id).await;
    let (_, third) = w.run_once().await.unwrap().unwrap();
    assert_eq!(third, JobOutcome::Failed);

    let stored = q.get(job.id).await.unwrap();
    assert_eq!(stored.state(), Some(JobState::Failed));
    assert_eq!(stored.attempts_made, 3);
    assert_eq!(q.counts().await.unwrap().failed, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn permanent_failure_skips_retries(pool: PgPool) {
    let q = queue(&pool);
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();

    let (_, outcome) = worker(q.clone(), AlwaysFails { permanent: true })
        .run_once()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed);
    assert_eq!(q.get(job.id).await.unwrap().attempts_made, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_job_can_be_retried_manually(pool: PgPool) {
    let q = queue(&pool).with_options(JobOptions {
        max_attempts: 1,
        backoff_ms: 1_000,
    });
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();
    worker(q.clone(), AlwaysFails { permanent: false })
        .run_once()
        .await
        .unwrap();

    let retried = q.retry(job.id).await.unwrap();
    assert_eq!(retried.state(), Some(JobState::Waiting));
    assert_eq!(retried.attempts_made, 0);
    assert!(retried.last_error.is_none());

    assert_matches!(
        q.retry(job.id).await,
        Err(QueueError::InvalidJobState { action: "retried", .. })
    );
    assert_matches!(q.retry(999_999).await, Err(QueueError::JobNotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn active_job_cannot_be_removed(pool: PgPool) {
    let q = queue(&pool);
    let active = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();
    sqlx::query("UPDATE queue_jobs SET state_id = $2, started_at = NOW() WHERE id = $1")
        .bind(active.id)
        .bind(JobState::Active.id())
        .execute(&pool)
        .await
        .unwrap();
    let waiting = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();

    assert_matches!(
        q.remove(active.id).await,
        Err(QueueError::InvalidJobState { action: "removed", .. })
    );
    q.remove(waiting.id).await.unwrap();
    assert_matches!(q.get(waiting.id).await, Err(QueueError::JobNotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stalled_jobs_are_requeued(pool: PgPool) {
    let q = queue(&pool);
    let job = q.add(RENDER_ARTIFACT_JOB, &json!({})).await.unwrap();
    sqlx::query(
        "UPDATE queue_jobs SET state_id = $2, attempts_made = 1, \
         started_at = NOW() - INTERVAL '10 minutes' WHERE id = $1",
    )
    .bind(job.id)
    .bind(JobState::Active.id())
    .execute(&pool)
    .await
    .unwrap();

    let (requeued, failed) =
        boxoffice_db::repositories::QueueJobRepo::recover_stalled(&pool, q.name(), 60)
            .await
            .unwrap();
    assert_eq!((requeued, failed), (1, 0));
    assert_eq!(q.get(job.id).await.unwrap().state(), Some(JobState::Waiting));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn worker_respects_concurrency_and_drains(pool: PgPool) {
    let q = queue(&pool);
    for i in 0..6 {
        q.add(RENDER_ARTIFACT_JOB, &json!({ "i": i })).await.unwrap();
    }

    let tracked = Arc::new(Tracked::default());
    let w = Arc::new(Worker::new(
        q.clone(),
        TrackedHandler(Arc::clone(&tracked)),
        WorkerOptions {
            concurrency: 2,
            poll_interval: Duration::from_millis(20),
            stalled_after: Duration::from_secs(300),
        },
    ));
    let cancel = CancellationToken::new();
    let handle = {
        let w = Arc::clone(&w);
        let cancel = cancel.clone();
        tokio::spawn(async move { w.run(cancel).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while q.counts().await.unwrap().completed < 6 {
        assert!(tokio::time::Instant::now() < deadline, "jobs did not finish");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    assert!(tracked.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(q.counts().await.unwrap().active, 0);
}

// ---------------------------------------------------------------------------
// Dispatch port
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn dispatch_routes_jobs_by_kind(pool: PgPool) {
    let dispatch = PgJobDispatch::new(pool.clone(), JobOptions::default()).unwrap();
    let sent = snapshot();
    for job in TicketJob::fan_out(sent.clone()) {
        dispatch.dispatch(job).await.unwrap();
    }

    let artifacts = queue(&pool)
        .jobs(JobState::Waiting, None, None)
        .await
        .unwrap();
    let confirmations = JobQueue::open(pool.clone(), CONFIRMATION_QUEUE)
        .unwrap()
        .jobs(JobState::Waiting, None, None)
        .await
        .unwrap();

    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name, RENDER_ARTIFACT_JOB);
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].name, SEND_CONFIRMATION_JOB);

    let decoded: TicketSnapshot = serde_json::from_value(confirmations[0].payload.clone()).unwrap();
    assert_eq!(decoded, sent);
}
