//! Queue job model for the durable job queue.

use boxoffice_core::queue::JobOptions;
use boxoffice_core::status::{JobState, StatusId};
use boxoffice_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `queue_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueJob {
    pub id: DbId,
    pub queue: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub state_id: StatusId,
    pub attempts_made: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
    pub run_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QueueJob {
    pub fn state(&self) -> Option<JobState> {
        JobState::from_id(self.state_id)
    }

    pub fn options(&self) -> JobOptions {
        JobOptions {
            max_attempts: self.max_attempts,
            backoff_ms: self.backoff_ms,
        }
    }
}

/// DTO for enqueueing a job.
#[derive(Debug, Clone)]
pub struct NewQueueJob {
    pub queue: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
    /// Earliest time the job may run. `None` means now.
    pub run_at: Option<Timestamp>,
}

/// Number of jobs per state in one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub delayed: i64,
}

impl JobCounts {
    pub fn set(&mut self, state: JobState, count: i64) {
        match state {
            JobState::Waiting => self.waiting = count,
            JobState::Active => self.active = count,
            JobState::Completed => self.completed = count,
            JobState::Failed => self.failed = count,
            JobState::Delayed => self.delayed = count,
        }
    }

    pub fn total(&self) -> i64 {
        self.waiting + self.active + self.completed + self.failed + self.delayed
    }
}
