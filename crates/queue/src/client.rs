//! Producer and admin handle for one named queue.

use std::time::Duration;

use boxoffice_core::queue::{is_known_queue, JobOptions};
use boxoffice_core::status::JobState;
use boxoffice_core::types::DbId;
use boxoffice_db::models::queue_job::{JobCounts, NewQueueJob, QueueJob};
use boxoffice_db::repositories::QueueJobRepo;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::QueueError;

#[derive(Debug, Clone)]
pub struct JobQueue {
    pool: PgPool,
    name: String,
    options: JobOptions,
}

impl JobQueue {
    /// Open a handle on a known queue with the default retry policy.
    pub fn open(pool: PgPool, name: &str) -> Result<Self, QueueError> {
        if !is_known_queue(name) {
            return Err(QueueError::UnknownQueue(name.to_string()));
        }
        Ok(Self {
            pool,
            name: name.to_string(),
            options: JobOptions::default(),
        })
    }

    /// Replace the retry policy applied to jobs added through this handle.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> JobOptions {
        self.options
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Enqueue a job that may run immediately.
    pub async fn add<T: Serialize>(&self, job_name: &str, payload: &T) -> Result<QueueJob, QueueError> {
        self.insert(job_name, serde_json::to_value(payload)?, None).await
    }

    /// Enqueue a job that becomes runnable after `delay`.
    pub async fn add_delayed<T: Serialize>(
        &self,
        job_name: &str,
        payload: &T,
        delay: Duration,
    ) -> Result<QueueJob, QueueError> {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        let run_at = chrono::Utc::now() + delay;
        self.insert(job_name, serde_json::to_value(payload)?, Some(run_at))
            .await
    }

    async fn insert(
        &self,
        job_name: &str,
        payload: serde_json::Value,
        run_at: Option<boxoffice_core::types::Timestamp>,
    ) -> Result<QueueJob, QueueError> {
        let job = QueueJobRepo::enqueue(
            &self.pool,
            &NewQueueJob {
                queue: self.name.clone(),
                name: job_name.to_string(),
                payload,
                options: self.options,
                run_at,
            },
        )
        .await?;
        tracing::debug!(queue = %self.name, job_id = job.id, job = job_name, "Job enqueued");
        Ok(job)
    }

    /// Number of jobs per state.
    pub async fn counts(&self) -> Result<JobCounts, QueueError> {
        Ok(QueueJobRepo::counts(&self.pool, &self.name).await?)
    }

    /// Page through the jobs in one state.
    pub async fn jobs(
        &self,
        state: JobState,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<QueueJob>, QueueError> {
        Ok(QueueJobRepo::list_by_state(&self.pool, &self.name, state, limit, offset).await?)
    }

    /// Fetch a job that belongs to this queue.
    pub async fn get(&self, id: DbId) -> Result<QueueJob, QueueError> {
        QueueJobRepo::find_by_id(&self.pool, id)
            .await?
            .filter(|j| j.queue == self.name)
            .ok_or_else(|| QueueError::JobNotFound {
                queue: self.name.clone(),
                id,
            })
    }

    /// Send a failed job back to `waiting` with a fresh attempt budget.
    pub async fn retry(&self, id: DbId) -> Result<QueueJob, QueueError> {
        match QueueJobRepo::retry(&self.pool, &self.name, id).await? {
            Some(job) => {
                tracing::info!(queue = %self.name, job_id = id, "Job retried manually");
                Ok(job)
            }
            None => {
                // Distinguish a missing job from one that is not failed.
                self.get(id).await?;
                Err(QueueError::InvalidJobState {
                    id,
                    action: "retried",
                })
            }
        }
    }

    /// Delete a job that is not currently running.
    pub async fn remove(&self, id: DbId) -> Result<(), QueueError> {
        if QueueJobRepo::remove(&self.pool, &self.name, id).await? {
            tracing::info!(queue = %self.name, job_id = id, "Job removed");
            return Ok(());
        }
        self.get(id).await?;
        Err(QueueError::InvalidJobState {
            id,
            action: "removed",
        })
    }
}
