//! Admin queue routes, mounted at `/admin/queues`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::queues;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(queues::queue_stats))
        .route("/{queue}/jobs", get(queues::list_jobs))
        .route("/{queue}/jobs/{id}", delete(queues::remove_job))
        .route("/{queue}/jobs/{id}/retry", post(queues::retry_job))
}
