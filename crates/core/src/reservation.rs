//! Reservation state machine and ticket codes.
//!
//! ```text
//! confirmed ──cancel──> cancelled (terminal)
//! ```

use crate::error::CoreError;
use crate::event::has_started;
use crate::status::ReservationStatus;
use crate::types::{Cents, DbId, Timestamp};

/// Prefix of every issued ticket code.
pub const TICKET_CODE_PREFIX: &str = "TKT";

/// Build a ticket code bound to `reservation_id`.
///
/// The random suffix makes codes unguessable; the id makes them unique.
pub fn issue_ticket_code(reservation_id: DbId) -> String {
    format!(
        "{TICKET_CODE_PREFIX}-{reservation_id}-{}",
        uuid::Uuid::new_v4().simple()
    )
}

/// Check that a reservation in `status` for an event starting at
/// `event_starts_at` may be cancelled at `now`.
pub fn ensure_cancellable(
    status: ReservationStatus,
    event_starts_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    match status {
        ReservationStatus::Cancelled => Err(CoreError::InvalidState(
            "Reservation is already cancelled".to_string(),
        )),
        ReservationStatus::Pending => Err(CoreError::InvalidState(
            "Only confirmed reservations can be cancelled".to_string(),
        )),
        ReservationStatus::Confirmed if has_started(event_starts_at, now) => {
            Err(CoreError::InvalidState(
                "Cannot cancel a reservation for an event that has already started".to_string(),
            ))
        }
        ReservationStatus::Confirmed => Ok(()),
    }
}

/// Total price of a reservation in cents.
pub fn total_cents(price_cents: Cents, ticket_count: i32) -> Cents {
    price_cents.saturating_mul(i64::from(ticket_count))
}
