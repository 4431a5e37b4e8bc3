pub mod auth;
pub mod events;
pub mod health;
pub mod queues;
pub mod reservations;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                             register (public)
/// /auth/login                                login (public)
/// /auth/refresh                              refresh (public)
/// /auth/logout                               logout (requires auth)
/// /auth/me                                   profile (requires auth)
///
/// /events                                    list (public), create (admin)
/// /events/{id}                               get (public), update, delete (admin)
/// /events/{id}/availability                  remaining capacity (public)
///
/// /reservations                              list own / all, create (requires auth)
/// /reservations/{id}                         get (owner or admin)
/// /reservations/{id}/cancel                  cancel (PATCH, owner or admin)
/// /reservations/{id}/ticket                  ticket PDF (GET, owner or admin)
///
/// /admin/queues/stats                        per-queue job counts (admin)
/// /admin/queues/{queue}/jobs                 list by state (admin)
/// /admin/queues/{queue}/jobs/{id}            remove (DELETE, admin)
/// /admin/queues/{queue}/jobs/{id}/retry      retry failed job (POST, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/events", events::router())
        .nest("/reservations", reservations::router())
        .nest("/admin/queues", queues::router())
}
