//! Handlers for the `/reservations` resource.
//!
//! Creation and cancellation go through the reservation workflow held in
//! [`AppState`]; listings read the joined detail projection directly.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use boxoffice_core::booking::{BookingReceipt, ReservationRecord};
use boxoffice_core::error::CoreError;
use boxoffice_core::queue::artifact_file_name;
use boxoffice_core::status::ReservationStatus;
use boxoffice_core::types::DbId;
use boxoffice_db::models::reservation::{
    CreateReservation, ReservationDetail, ReservationListQuery,
};
use boxoffice_db::repositories::ReservationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::validated::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/reservations
///
/// Customers see their own reservations; admins see everyone's.
pub async fn list_reservations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReservationListQuery>,
) -> AppResult<Json<DataResponse<Vec<ReservationDetail>>>> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            ReservationStatus::parse(s)
                .ok_or_else(|| CoreError::Validation(format!("Unknown reservation status '{s}'")))
        })
        .transpose()?;

    let owner = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };

    let items = ReservationRepo::list(&state.pool, owner, status, &params).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/reservations/{id}
pub async fn get_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReservationDetail>>> {
    let detail = ReservationRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id,
        })?;

    if !auth.is_admin() && detail.user_id != auth.user_id {
        return Err(CoreError::Forbidden(
            "You do not have permission to view this reservation".into(),
        )
        .into());
    }
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/reservations
///
/// Book tickets for the caller. A full event answers 409 with the number of
/// tickets still available.
pub async fn create_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateReservation>,
) -> AppResult<(StatusCode, Json<DataResponse<BookingReceipt>>)> {
    let receipt = state
        .workflow
        .create_reservation(auth.user_id, input.event_id, input.ticket_count)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: receipt })))
}

/// PATCH /api/v1/reservations/{id}/cancel
pub async fn cancel_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReservationRecord>>> {
    let cancelled = state.workflow.cancel_reservation(&auth.actor(), id).await?;
    Ok(Json(DataResponse { data: cancelled }))
}

/// GET /api/v1/reservations/{id}/ticket
///
/// The rendered ticket PDF. Answers 404 until the worker has written it.
pub async fn download_ticket(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let reservation = ReservationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id,
        })?;

    if !auth.is_admin() && reservation.user_id != auth.user_id {
        return Err(CoreError::Forbidden(
            "You do not have permission to view this ticket".into(),
        )
        .into());
    }
    if reservation.status_id == ReservationStatus::Cancelled.id() {
        return Err(CoreError::InvalidState(format!("Reservation {id} is cancelled")).into());
    }

    let filename = artifact_file_name(id);
    let path = state.config.tickets_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::NotFound {
                entity: "Ticket",
                id,
            }
            .into());
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read ticket artifact");
            return Err(AppError::InternalError(format!("Could not read ticket {id}")));
        }
    };

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
