//! Reservation entity model and DTOs.

use boxoffice_core::booking::ReservationRecord;
use boxoffice_core::status::{ReservationStatus, StatusId};
use boxoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `reservations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: DbId,
    pub user_id: DbId,
    pub event_id: DbId,
    pub ticket_count: i32,
    pub status_id: StatusId,
    pub ticket_code: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reservation {
    /// Map to the workflow record. Unknown status ids are a schema mismatch.
    pub fn into_record(self) -> Result<ReservationRecord, String> {
        let status = ReservationStatus::from_id(self.status_id)
            .ok_or_else(|| format!("unknown reservation status id {}", self.status_id))?;
        Ok(ReservationRecord {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            ticket_count: self.ticket_count,
            status,
            ticket_code: self.ticket_code,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
        })
    }
}

/// A reservation joined with the event and customer fields shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservationDetail {
    pub id: DbId,
    pub user_id: DbId,
    pub event_id: DbId,
    pub ticket_count: i32,
    pub status: String,
    pub ticket_code: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub event_name: String,
    pub event_starts_at: Timestamp,
    pub event_location: Option<String>,
    pub price_cents: i64,
    pub total_cents: i64,
    pub user_name: String,
    pub user_email: String,
}

/// Request body for `POST /api/v1/reservations`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservation {
    pub event_id: DbId,
    #[validate(range(min = 1, message = "ticket_count must be at least 1"))]
    pub ticket_count: i32,
}

/// Query parameters for `GET /api/v1/reservations`.
#[derive(Debug, Default, Deserialize)]
pub struct ReservationListQuery {
    /// Status name filter (`confirmed`, `cancelled`, ...).
    pub status: Option<String>,
    pub event_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
