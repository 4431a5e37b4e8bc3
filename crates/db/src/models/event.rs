//! Event entity model and DTOs.

use boxoffice_core::booking::EventRecord;
use boxoffice_core::capacity;
use boxoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub starts_at: Timestamp,
    pub capacity_max: i32,
    pub capacity_used: i32,
    pub price_cents: i64,
    pub category: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    pub fn available(&self) -> i32 {
        capacity::available(self.capacity_max, self.capacity_used)
    }
}

impl From<Event> for EventRecord {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            name: e.name,
            starts_at: e.starts_at,
            location: e.location,
            price_cents: e.price_cents,
            capacity_max: e.capacity_max,
            capacity_used: e.capacity_used,
        }
    }
}

/// DTO for creating an event. `capacity_used` always starts at zero.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvent {
    #[validate(length(min = 2, max = 255, message = "Name must be 2-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: String,
    pub starts_at: Timestamp,
    #[validate(range(min = 1, message = "capacity_max must be at least 1"))]
    pub capacity_max: i32,
    #[validate(range(min = 0, message = "price_cents cannot be negative"))]
    pub price_cents: i64,
    pub category: Option<String>,
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
}

/// DTO for updating an event. Only non-`None` fields are applied.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEvent {
    #[validate(length(min = 2, max = 255, message = "Name must be 2-255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,
    pub starts_at: Option<Timestamp>,
    #[validate(range(min = 1, message = "capacity_max must be at least 1"))]
    pub capacity_max: Option<i32>,
    #[validate(range(min = 0, message = "price_cents cannot be negative"))]
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
}

/// Query parameters for `GET /api/v1/events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
