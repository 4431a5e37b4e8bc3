use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::reservations;
use crate::state::AppState;

/// Routes mounted at `/reservations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/{id}", get(reservations::get_reservation))
        .route("/{id}/cancel", patch(reservations::cancel_reservation))
        .route("/{id}/ticket", get(reservations::download_ticket))
}
