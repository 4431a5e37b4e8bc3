//! Admin handlers for ticket queue introspection.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use boxoffice_core::error::CoreError;
use boxoffice_core::queue::KNOWN_QUEUES;
use boxoffice_core::status::JobState;
use boxoffice_core::types::{DbId, Timestamp};
use boxoffice_db::models::queue_job::{JobCounts, QueueJob};
use boxoffice_queue::JobQueue;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::query::JobListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Per-queue counts for `GET /admin/queues/stats`.
#[derive(Debug, Serialize)]
pub struct QueueStats {
    pub queues: BTreeMap<&'static str, JobCounts>,
    pub timestamp: Timestamp,
}

/// GET /api/v1/admin/queues/stats
pub async fn queue_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<QueueStats>>> {
    let mut queues = BTreeMap::new();
    for name in KNOWN_QUEUES {
        let counts = JobQueue::open(state.pool.clone(), name)?.counts().await?;
        queues.insert(name, counts);
    }
    Ok(Json(DataResponse {
        data: QueueStats {
            queues,
            timestamp: Utc::now(),
        },
    }))
}

/// GET /api/v1/admin/queues/{queue}/jobs?state=waiting&limit=&offset=
pub async fn list_jobs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(queue): Path<String>,
    Query(params): Query<JobListParams>,
) -> AppResult<Json<DataResponse<Vec<QueueJob>>>> {
    let job_state = match params.state.as_deref() {
        None => JobState::Waiting,
        Some(s) => JobState::parse(s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job state '{s}'")))?,
    };
    let jobs = JobQueue::open(state.pool.clone(), &queue)?
        .jobs(job_state, params.limit, params.offset)
        .await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/v1/admin/queues/{queue}/jobs/{id}/retry
pub async fn retry_job(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((queue, id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<QueueJob>>> {
    let job = JobQueue::open(state.pool.clone(), &queue)?.retry(id).await?;
    tracing::info!(queue = %queue, job_id = id, admin_id = admin.user_id, "Job retry requested");
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/admin/queues/{queue}/jobs/{id}
pub async fn remove_job(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((queue, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    JobQueue::open(state.pool.clone(), &queue)?.remove(id).await?;
    tracing::info!(queue = %queue, job_id = id, admin_id = admin.user_id, "Job removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
