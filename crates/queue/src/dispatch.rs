//! Postgres-backed [`JobDispatch`] for the reservation workflow.

use async_trait::async_trait;
use boxoffice_core::booking::JobDispatch;
use boxoffice_core::error::CoreError;
use boxoffice_core::queue::{
    JobOptions, TicketJob, TicketJobKind, CONFIRMATION_QUEUE, TICKET_ARTIFACT_QUEUE,
};
use sqlx::PgPool;

use crate::client::JobQueue;
use crate::error::QueueError;

/// Routes ticket jobs to the artifact and confirmation queues.
#[derive(Clone)]
pub struct PgJobDispatch {
    artifacts: JobQueue,
    confirmations: JobQueue,
}

impl PgJobDispatch {
    pub fn new(pool: PgPool, options: JobOptions) -> Result<Self, QueueError> {
        Ok(Self {
            artifacts: JobQueue::open(pool.clone(), TICKET_ARTIFACT_QUEUE)?.with_options(options),
            confirmations: JobQueue::open(pool, CONFIRMATION_QUEUE)?.with_options(options),
        })
    }

    fn queue_for(&self, kind: TicketJobKind) -> &JobQueue {
        match kind {
            TicketJobKind::RenderArtifact => &self.artifacts,
            TicketJobKind::SendConfirmation => &self.confirmations,
        }
    }
}

#[async_trait]
impl JobDispatch for PgJobDispatch {
    async fn dispatch(&self, job: TicketJob) -> Result<(), CoreError> {
        self.queue_for(job.kind)
            .add(job.kind.job_name(), &job.snapshot)
            .await
            .map(|_| ())
            .map_err(|e| CoreError::Internal(e.to_string()))
    }
}
