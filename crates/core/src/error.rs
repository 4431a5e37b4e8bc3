use crate::types::DbId;

/// Domain error taxonomy shared by the workflow, the stores, and the API.
///
/// Every variant is a distinct, identifiable kind so the HTTP layer can map
/// it to its own status code.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "Not enough capacity for event {event_id}: requested {requested}, only {available} left"
    )]
    CapacityExceeded {
        event_id: DbId,
        requested: i32,
        available: i32,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_reports_remaining() {
        let err = CoreError::CapacityExceeded {
            event_id: 7,
            requested: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Not enough capacity for event 7: requested 3, only 2 left"
        );
    }

    #[test]
    fn not_found_names_entity() {
        let err = CoreError::NotFound {
            entity: "Reservation",
            id: 12,
        };
        assert_eq!(err.to_string(), "Entity not found: Reservation with id 12");
    }
}
