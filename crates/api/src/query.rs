//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer via `clamp_limit` /
/// `clamp_offset`.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for `GET /admin/queues/{queue}/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    /// Job state name; `waiting` when absent.
    pub state: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
