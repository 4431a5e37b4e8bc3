//! Handlers for the `/events` resource.
//!
//! Reads are public. Writes require the admin role. `capacity_used` is never
//! accepted from clients; only the reservation workflow moves it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use boxoffice_core::capacity::{self, Availability};
use boxoffice_core::error::CoreError;
use boxoffice_core::event;
use boxoffice_core::types::DbId;
use boxoffice_db::models::event::{CreateEvent, Event, EventListQuery, UpdateEvent};
use boxoffice_db::repositories::{EventRepo, ReservationRepo};
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::validated::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// An event with its remaining ticket count.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub available: i32,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        let available = event.available();
        Self { event, available }
    }
}

/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> AppResult<Json<DataResponse<Vec<EventResponse>>>> {
    if let Some(category) = params.category.as_deref() {
        event::validate_category(category)?;
    }
    let events = EventRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse {
        data: events.into_iter().map(EventResponse::from).collect(),
    }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EventResponse>>> {
    let event = find_event(&state, id).await?;
    Ok(Json(DataResponse { data: event.into() }))
}

/// GET /api/v1/events/{id}/availability
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Availability>>> {
    let availability = state.workflow.available_capacity(id).await?;
    Ok(Json(DataResponse { data: availability }))
}

/// POST /api/v1/events
pub async fn create_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateEvent>,
) -> AppResult<(StatusCode, Json<DataResponse<EventResponse>>)> {
    event::validate_name(&input.name)?;
    event::validate_price(input.price_cents)?;
    event::validate_starts_at(input.starts_at, Utc::now())?;
    capacity::validate_capacity_max(input.capacity_max, 0)?;
    if let Some(category) = input.category.as_deref() {
        event::validate_category(category)?;
    }

    let event = EventRepo::create(&state.pool, &input).await?;
    tracing::info!(
        event_id = event.id,
        capacity_max = event.capacity_max,
        admin_id = admin.user_id,
        "Event created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: event.into() })))
}

/// PUT /api/v1/events/{id}
///
/// Partial update. `capacity_max` may not drop below the tickets already sold.
pub async fn update_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateEvent>,
) -> AppResult<Json<DataResponse<EventResponse>>> {
    if let Some(name) = input.name.as_deref() {
        event::validate_name(name)?;
    }
    if let Some(price) = input.price_cents {
        event::validate_price(price)?;
    }
    if let Some(starts_at) = input.starts_at {
        event::validate_starts_at(starts_at, Utc::now())?;
    }
    if let Some(category) = input.category.as_deref() {
        event::validate_category(category)?;
    }

    match EventRepo::update(&state.pool, id, &input).await? {
        Some(event) => {
            tracing::info!(event_id = id, admin_id = admin.user_id, "Event updated");
            Ok(Json(DataResponse { data: event.into() }))
        }
        None => {
            // Either the event is gone or the new capacity is too small.
            let current = find_event(&state, id).await?;
            let capacity_max = input.capacity_max.unwrap_or(current.capacity_max);
            capacity::validate_capacity_max(capacity_max, current.capacity_used)?;
            Err(CoreError::Conflict(format!("Event {id} changed during update, retry")).into())
        }
    }
}

/// DELETE /api/v1/events/{id}
///
/// Refused with 409 while any reservation references the event.
pub async fn delete_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let reservations = ReservationRepo::count_for_event(&state.pool, id).await?;
    if reservations > 0 {
        return Err(CoreError::Conflict(format!(
            "Event {id} has {reservations} reservation(s) and cannot be deleted"
        ))
        .into());
    }

    if !EventRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound { entity: "Event", id }.into());
    }
    tracing::info!(event_id = id, admin_id = admin.user_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_event(state: &AppState, id: DbId) -> AppResult<Event> {
    let event = EventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Event", id })?;
    Ok(event)
}
