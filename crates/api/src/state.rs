use std::sync::Arc;

use boxoffice_core::booking::ReservationWorkflow;
use boxoffice_db::booking_store::PgBookingStore;
use boxoffice_queue::PgJobDispatch;

use crate::config::ServerConfig;

/// The workflow as wired in production: Postgres store, Postgres queue.
pub type Workflow = ReservationWorkflow<PgBookingStore, PgJobDispatch>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is a pool handle or behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: boxoffice_db::DbPool,
    /// Server configuration (JWT settings, queue options).
    pub config: Arc<ServerConfig>,
    /// The reservation workflow with its store and dispatch ports.
    pub workflow: Arc<Workflow>,
}

impl AppState {
    /// Build the state and the workflow it carries from a pool and config.
    pub fn new(
        pool: boxoffice_db::DbPool,
        config: ServerConfig,
    ) -> Result<Self, boxoffice_queue::QueueError> {
        let dispatch = PgJobDispatch::new(pool.clone(), config.job_options)?;
        let store = PgBookingStore::new(pool.clone());
        Ok(Self {
            pool,
            config: Arc::new(config),
            workflow: Arc::new(ReservationWorkflow::new(store, dispatch)),
        })
    }
}
